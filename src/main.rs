//! Command-line driver for a single BLEDOM LED strip.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use log::info;

use bledom_bridge::{AppConfig, Effect, LightStrip};

const USAGE: &str = "\
Usage: bledom-bridge [--config <path>] [--device <identity>] <command>

The device identity may also come from the BLEDOM_DEVICE environment
variable or the config file.

Commands:
  power on|off
  brightness <0-100>
  rgb <r> <g> <b>
  hue <0-360>
  saturation <0-100>
  effect <name>
  speed <0-100>
  effects             list the known effect names
";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut identity: Option<String> = None;
    let mut command: Vec<String> = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(PathBuf::from(args.next().context("--config needs a path")?));
            }
            "--device" => {
                identity = Some(args.next().context("--device needs an identity")?);
            }
            "--help" | "-h" => {
                print!("{USAGE}");
                return Ok(());
            }
            _ => command.push(arg),
        }
    }

    if command.first().map(String::as_str) == Some("effects") {
        for effect in Effect::ALL {
            println!("{} (0x{:02x})", effect.name(), effect.code());
        }
        return Ok(());
    }

    let mut config = match &config_path {
        Some(path) => AppConfig::load(path).await?,
        None => AppConfig::default(),
    };
    if let Some(identity) = identity.or_else(|| env::var("BLEDOM_DEVICE").ok()) {
        config.device.identity = identity;
    }

    let strip = LightStrip::new(config.device).await?;
    run_command(&strip, &command).await?;
    info!("Cached state: {:?}", strip.state());
    strip.shutdown().await;
    Ok(())
}

async fn run_command(strip: &LightStrip, command: &[String]) -> Result<()> {
    match command {
        [op, rest @ ..] => match (op.as_str(), rest) {
            ("power", [state]) => match state.as_str() {
                "on" => strip.set_power(true).await?,
                "off" => strip.set_power(false).await?,
                other => bail!("power expects on|off, got {other}"),
            },
            ("brightness", [level]) => strip.set_brightness(parse(level, "brightness")?).await?,
            ("rgb", [r, g, b]) => {
                strip
                    .set_rgb(parse(r, "red")?, parse(g, "green")?, parse(b, "blue")?)
                    .await?;
            }
            ("hue", [hue]) => strip.set_hue(parse(hue, "hue")?).await?,
            ("saturation", [saturation]) => {
                strip
                    .set_saturation(parse(saturation, "saturation")?)
                    .await?;
            }
            ("effect", [name]) => strip.set_effect(name.parse()?).await?,
            ("speed", [speed]) => strip.set_effect_speed(parse(speed, "speed")?).await?,
            _ => bail!("unrecognized command\n{USAGE}"),
        },
        [] => bail!("missing command\n{USAGE}"),
    }
    Ok(())
}

fn parse<T: std::str::FromStr>(value: &str, what: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid {what}: {value}"))
}
