use anyhow::Result;

mod app;
mod logging;

fn main() -> Result<()> {
    let args = filedog::cli::parse();
    app::run(args)
}
