use clap::{Args, Subcommand};
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFormat;
use crate::config::{Config, ConfigValue};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# liftsync configuration

# Directory for the local document store
# (default: ~/.local/share/liftsync)
# data_dir: ~/.local/share/liftsync

# Signed-in user. Leave unset to keep plans on this device only.
# user_id: your-user-id
# email: you@example.com

# Milliseconds a write waits for the store before it is reported as queued
fallback_delay_ms: 1000

# Milliseconds after a drag before remote updates are shown again
settle_delay_ms: 100

# Row height used to turn drag distance into positions
item_height: 80.0

# Milliseconds of quiet before edited sets are written
set_write_debounce_ms: 500
"#;

fn print_value<T: Display>(name: &str, value: &ConfigValue<T>) {
    println!("{}: {}", name, value.value);
    println!("  source: {}", value.source);
    println!();
}

fn print_optional(name: &str, value: &ConfigValue<Option<String>>) {
    println!("{}: {}", name, value.value.as_deref().unwrap_or("(not set)"));
    println!("  source: {}", value.source);
    println!();
}

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        print_optional("user_id", &config.user_id);
                        print_optional("email", &config.email);
                        print_value("fallback_delay_ms", &config.fallback_delay_ms);
                        print_value("settle_delay_ms", &config.settle_delay_ms);
                        print_value("item_height", &config.item_height);
                        print_value("set_write_debounce_ms", &config.set_write_debounce_ms);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'liftsync config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSource;
    use tempfile::tempdir;

    #[test]
    fn test_default_file_parses_to_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, DEFAULT_CONFIG).unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.fallback_delay_ms.value, 1000);
        assert_eq!(config.fallback_delay_ms.source, ConfigSource::File);
        assert_eq!(config.user_id.value, None);
        assert_eq!(config.data_dir.source, ConfigSource::Default);
    }

    #[test]
    fn test_init_writes_to_given_path_once() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.yaml");
        let config = Config::load(Some(config_path.clone())).unwrap();
        let cmd = ConfigCommand {
            command: ConfigSubcommand::Init,
        };

        cmd.run(&config, Some(config_path.clone())).unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), DEFAULT_CONFIG);

        fs::write(&config_path, "user_id: kept").unwrap();
        cmd.run(&config, Some(config_path.clone())).unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), "user_id: kept");
    }
}
