use std::path::Path;

use clap::{ArgEnum, Parser};
use eyre::Result;
use vizjson::{
    Config, Document, ForcedPrivacy, RenderingContext, Visualization, VisualizationSource,
    VizJson3Builder, VizJsonBuilder, VizJsonCache, VizJsonPresenter,
};

#[derive(ArgEnum, Clone, Copy, Debug)]
enum Force {
    Named,
    Anonymous,
}

impl From<Force> for ForcedPrivacy {
    fn from(f: Force) -> Self {
        match f {
            Force::Named => ForcedPrivacy::ForceNamed,
            Force::Anonymous => ForcedPrivacy::ForceAnonymous,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(name = "vizjson", about, version)]
struct Args {
    /// Increase output logging verbosity.
    #[clap(short, long)]
    verbose: bool,

    /// Configuration file (JSON or YAML). Defaults apply if it doesn't exist.
    #[clap(short, long, default_value = "vizjson.yml")]
    config: String,

    /// Render named-map documents instead of direct ones.
    #[clap(long)]
    named: bool,

    /// Request vector rendering.
    #[clap(long)]
    vector: bool,

    /// Render legacy ("0.1.0") documents.
    #[clap(long)]
    legacy: bool,

    /// Build uncached documents with the given privacy override.
    #[clap(long, arg_enum)]
    force: Option<Force>,

    /// Pretty-print the documents.
    #[clap(long)]
    pretty: bool,

    /// Which visualization file(s) to render.
    visualizations: Vec<String>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    }) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let patterns = if args.visualizations.is_empty() {
        vec!["*.viz.json", "visualizations/*.json", "visualizations/*.yml"]
    } else {
        args.visualizations
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
    };

    match render_visualizations(&args, &patterns) {
        Ok(0) => log::warn!("No visualizations found"),
        Ok(count) => log::info!("Rendered {} visualization(s)", count),
        Err(e) => {
            log::error!("Failed: {:?}", e);
            std::process::exit(1);
        }
    }
}

fn render_visualizations(args: &Args, patterns: &[&str]) -> Result<u64> {
    let config = Config::load(&args.config)?;
    let cache = config.cache();
    let builder = VizJson3Builder::default().with_named_map_sources(config.named_map_sources());
    let mut count = 0_u64;
    for pattern in patterns {
        for entry in VisualizationSource::Files(pattern.to_string()).iter()? {
            let (path, visualization) = entry?;
            let cache = cache.as_ref().map(|c| c as &dyn VizJsonCache);
            let document = if args.legacy {
                render(args, VizJsonPresenter::legacy(&visualization, cache)?)?
            } else {
                render(
                    args,
                    VizJsonPresenter::with_builder(&visualization, cache, builder.clone())?,
                )?
            };
            emit(args, &path, &visualization, &document)?;
            count += 1;
        }
    }
    Ok(count)
}

fn render<B: VizJsonBuilder>(args: &Args, presenter: VizJsonPresenter<B>) -> Result<Document> {
    Ok(match (args.force, args.named) {
        (Some(force), named) => {
            let ctx = if named {
                RenderingContext::named_map()
            } else {
                RenderingContext::default()
            };
            presenter.calculate_vizjson(
                ctx.with_forced_privacy(force.into())
                    .with_vector(args.vector),
            )?
        }
        (None, true) => presenter.to_named_map_vizjson(args.vector)?,
        (None, false) => presenter.to_vizjson(args.vector)?,
    })
}

fn emit(
    args: &Args,
    path: &Path,
    visualization: &Visualization,
    document: &Document,
) -> Result<()> {
    log::info!(
        "{} ({}) -> version {}, digest {}",
        path.display(),
        visualization.id,
        document.version().unwrap_or("?"),
        document.digest()?
    );
    let json = if args.pretty {
        serde_json::to_string_pretty(document)?
    } else {
        document.to_json_string()?
    };
    println!("{}", json);
    Ok(())
}
