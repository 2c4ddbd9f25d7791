use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = lumen::cli::parse();
    app::run(args)
}
