//! Recommendation ML Worker - Entry Point

use core_config::tracing::install_color_eyre;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();
    recs_ml_worker::run().await
}
