use brisk::error::ConfigError;
use brisk::{
    Component, ComponentError, Node, Props, RenderConfig, RenderContext, SsrRenderer, TagElement,
};
use clap::{Arg, Command};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let matches = Command::new("brisk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render a demo page with out-of-order suspense to stdout")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Load render settings from a TOML file"),
        )
        .arg(
            Arg::new("lazy-regions")
                .long("lazy-regions")
                .help("Start suspended components only once the page shell is written")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Request URL passed to components")
                .default_value("/"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    init_logging(&matches)?;

    let config = load_configuration(&matches).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let url = matches.get_one::<String>("url").map(String::as_str).unwrap_or("/");
    info!("Rendering {} (eager regions: {})", url, config.eager_regions);

    let renderer = SsrRenderer::new(config);
    let mut stream = renderer.render_to_stream(demo_page(), RenderContext::new(url));
    let mut stdout = tokio::io::stdout();

    while let Some(chunk) = stream.next_chunk().await {
        match chunk {
            Ok(bytes) => {
                stdout.write_all(&bytes).await?;
                stdout.flush().await?;
            }
            Err(e) => {
                error!("Render failed after {} bytes: {}", stream.bytes_received(), e);
                return Err(e.into());
            }
        }
    }

    stdout.write_all(b"\n").await?;
    Ok(())
}

fn init_logging(matches: &clap::ArgMatches) -> Result<(), ConfigError> {
    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("brisk={default_level}")))
        .map_err(|e| ConfigError::InvalidConfig(format!("Failed to create log filter: {e}")))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).compact())
        .init();

    Ok(())
}

fn load_configuration(matches: &clap::ArgMatches) -> Result<RenderConfig, ConfigError> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => RenderConfig::from_file(path)?,
        None => RenderConfig::from_env()?,
    };

    if matches.get_flag("lazy-regions") {
        config.eager_regions = false;
    }

    config.validate()?;
    Ok(config)
}

fn delayed_section(name: &str, millis: u64, title: &'static str, body: &'static str) -> Component {
    Component::future(name, move |_, _| async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok::<_, ComponentError>(
            TagElement::new("section")
                .attr("class", "card")
                .child(TagElement::new("h2").child(title))
                .child(TagElement::new("p").child(body)),
        )
    })
    .with_suspense(TagElement::new("p").attr("class", "skeleton").child(format!("Loading {title}...")))
}

fn demo_page() -> Node {
    let header = Component::sync("Header", |_, ctx| {
        Ok::<_, ComponentError>(TagElement::new("header").child(format!("brisk demo for {}", ctx.url())))
    });
    let recommendations =
        delayed_section("Recommendations", 300, "Recommendations", "Three things you might like.");
    let news = delayed_section("News", 100, "News", "Streaming HTML arrives out of order.");

    TagElement::new("html")
        .child(
            TagElement::new("head")
                .child(TagElement::new("meta").attr("charset", "utf-8"))
                .child(TagElement::new("title").child("brisk")),
        )
        .child(
            TagElement::new("body")
                .child(header.element(Props::new()))
                .child(
                    TagElement::new("main")
                        .child(recommendations.element(Props::new()))
                        .child(news.element(Props::new())),
                ),
        )
        .into()
}
