//! # Comptoir Back Office Entry Point
//!
//! The setup lives in lib.rs so the commands stay testable.

#[tokio::main]
async fn main() {
    if let Err(e) = comptoir_backoffice::run().await {
        eprintln!("comptoir: {}", e);
        std::process::exit(1);
    }
}
