use psn_library::{cli, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init();
    cli::cli_main().await;
}
