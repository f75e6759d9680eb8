use anyhow::{Context, Result};

use freq_depickle::Converter;

fn main() -> Result<()> {
    env_logger::init();

    let cwd = std::env::current_dir().context("resolving working directory")?;
    let converter = Converter::new(cwd);
    converter.run().with_context(|| {
        format!("converting measurements in {}", converter.input_dir().display())
    })?;

    Ok(())
}
