
use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, error};

use super::{expect_json, HttpTransport, MalformedResponse, ParseResult, Payload, Request, Result};

fn read_total(response: &Value, pointer: &str) -> ParseResult<u32> {
    let total = response
        .pointer(pointer)
        .ok_or_else(|| MalformedResponse::new(format!("no record count at {}", pointer)))?;

    // Seen as both a number and a numeric string
    let parsed = match total {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| MalformedResponse::new(format!("bad record count at {}: {}", pointer, total)))
}

fn parse_pages<R, P>(first: Value, rest: Vec<(u32, Option<Payload>)>, parser: P) -> ParseResult<Vec<R>>
where
    P: Fn(&Value) -> ParseResult<Vec<R>>,
{
    let mut records = parser(&first)?;

    for (offset, page) in rest {
        let page = expect_json(page)
            .map_err(|e| MalformedResponse::new(format!("page at offset {}: {}", offset, e.context)))?;
        records.extend(parser(&page)?);
    }

    Ok(records)
}

/// Fetch every page of a paged query.
///
/// The first page tells us how many records there are in total (at `total_pointer`, a json
/// pointer); the remaining pages are then requested all at once. Records come back in page
/// order. Any failed or unparseable page fails the whole fetch.
pub async fn fetch_paginated<T, R, P, U>(
    transport: &T,
    parser: P,
    page_request: U,
    total_pointer: &str,
    page_size: u32,
) -> Result<Vec<R>>
where
    T: HttpTransport + ?Sized,
    P: Fn(&Value) -> ParseResult<Vec<R>>,
    U: Fn(u32, u32) -> Request,
{
    let page_size = page_size.max(1);

    let first = match transport.get(page_request(0, page_size)).await? {
        Some(page) => expect_json(Some(page))?,
        None => return Ok(vec![]),
    };

    let total = read_total(&first, total_pointer)?;
    let offsets: Vec<u32> = (page_size..total).step_by(page_size as usize).collect();
    debug!(total, pages = offsets.len() + 1, "Fetching paginated data");

    let rest = try_join_all(
        offsets.iter().map(|&offset| transport.get(page_request(offset, page_size)))
    ).await?;

    parse_pages(first, offsets.into_iter().zip(rest).collect(), parser).map_err(|e| {
        error!("Cannot parse data: {}", e);
        e.into()
    })
}
