use std::fs::File;
use std::io::{self, BufRead, BufReader, Stderr, StdinLock, Write};

use tracing::warn;

use super::{BrowserSurface, LoadHandler, TextVisitor};

const TERMINAL: &str = "/dev/tty";

/// A stand-in for an embedded browser: the user signs in with their own browser, opens the
/// finish page and pastes what it shows into the terminal.
pub struct ConsoleSurface<R, W> {
    input: R,
    output: W,
    finish_url: String,
    current: String,
    page_text: String,
    pending: Option<TextVisitor>,
    closed: bool,
}

impl ConsoleSurface<StdinLock<'static>, Stderr> {
    pub fn stdio(finish_url: &str) -> Self {
        ConsoleSurface::new(io::stdin().lock(), io::stderr(), finish_url)
    }
}

impl ConsoleSurface<Box<dyn BufRead>, Stderr> {
    /// Reads from the controlling terminal, for when stdin is taken by the host channel. With no
    /// terminal the flow ends at once without a token.
    pub fn terminal(finish_url: &str) -> Self {
        let input: Box<dyn BufRead> = match File::open(TERMINAL) {
            Ok(tty) => Box::new(BufReader::new(tty)),
            Err(e) => {
                warn!("Can't open {} for login: {}", TERMINAL, e);
                Box::new(io::empty())
            }
        };
        ConsoleSurface::new(input, io::stderr(), finish_url)
    }
}

impl<R: BufRead, W: Write> ConsoleSurface<R, W> {
    pub fn new(input: R, output: W, finish_url: &str) -> Self {
        ConsoleSurface {
            input,
            output,
            finish_url: finish_url.to_string(),
            current: String::new(),
            page_text: String::new(),
            pending: None,
            closed: false,
        }
    }

    fn read_page(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl<R: BufRead, W: Write> BrowserSurface for ConsoleSurface<R, W> {
    fn navigate(&mut self, url: &str) {
        self.current = url.to_string();
        let _ = writeln!(self.output, "Sign in to PlayStation Network at:\n\n    {}\n", url);
    }

    fn current_url(&self) -> String {
        self.current.clone()
    }

    fn get_text(&mut self, visitor: TextVisitor) {
        self.pending = Some(visitor);
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn run(&mut self, handler: &mut dyn LoadHandler) {
        let _ = writeln!(
            self.output,
            "Once signed in, open {} and paste what it shows here:",
            self.finish_url
        );

        while !self.closed {
            let page = match self.read_page() {
                Some(page) if page.is_empty() => continue,
                Some(page) => page,
                None => {
                    self.closed = true;
                    break;
                }
            };

            self.current = self.finish_url.clone();
            self.page_text = page;
            handler.on_load_end(self);

            if let Some(visitor) = self.pending.take() {
                let text = self.page_text.clone();
                visitor(self, text);
            }
        }
    }
}
