use super::Config;
use crate::error::ShardFetchError;
use config::Config as ConfigBuilder;

pub fn load_config(config_path: &str) -> Result<Config, ShardFetchError> {
    let config_builder = ConfigBuilder::builder()
        .add_source(config::File::with_name(config_path))
        .build()?;

    let config: Config = config_builder.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
