#[tokio::main]
async fn main() {
    if let Err(err) = timo_lib::run().await {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
