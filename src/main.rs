#[tokio::main]
async fn main() {
    if let Err(err) = tourguide_lib::run().await {
        eprintln!("tourguide: {err:#}");
        std::process::exit(1);
    }
}
