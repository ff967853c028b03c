#[tokio::main]
async fn main() {
  if let Err(e) = nutri_log_lib::run().await {
    eprintln!("nutri-log error: {}", e);
    std::process::exit(1);
  }
}
