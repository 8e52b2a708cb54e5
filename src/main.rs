use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use fieldmap::cli::{BackendsArgs, Cli, Command, InspectArgs, ReportFormat, ServeArgs, TileArgs};
use fieldmap::config::MapConfig;
use fieldmap::map::BackendRegistry;
use fieldmap::mbtiles::{decode_tile_payload, parse_tile_spec, summarize_tile, MbtilesFile};
use fieldmap::offline::{layer_id, load_offline_layers, OfflineLayer};
use fieldmap::output::{
    backends_json, format_backend_lines, format_tile_line, format_tile_summary_text,
    format_tileset_info_lines,
};
use fieldmap::server::TileHttpServer;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);
    let config = MapConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Inspect(args) => run_inspect(args),
        Command::Tile(args) => run_tile(args),
        Command::Serve(args) => run_serve(args, &config),
        Command::Backends(args) => run_backends(args, &config),
    }
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let file = MbtilesFile::open(&args.input)?;
    if args.tilejson {
        let id = layer_id(&args.input).unwrap_or_else(|| "tiles".to_string());
        let template = TileHttpServer::new(fieldmap::server::DEFAULT_PORT).url_template(&id);
        println!("{}", serde_json::to_string_pretty(&file.tilejson(&template))?);
        return Ok(());
    }
    match args.output {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(file.info())?),
        ReportFormat::Text => {
            for line in format_tileset_info_lines(file.info()) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn run_tile(args: TileArgs) -> Result<()> {
    let coord = parse_tile_spec(&args.tile)?;
    if args.layer.is_some() && !args.summary {
        anyhow::bail!("--layer requires --summary");
    }
    let file = MbtilesFile::open(&args.input)?;
    let tile = file.get_tile(coord)?;
    println!("{}", format_tile_line(coord, tile.as_ref()));
    let Some(tile) = tile else {
        return Ok(());
    };
    if let Some(out) = args.out.as_deref() {
        let bytes = if args.decompress {
            decode_tile_payload(&tile.data)?
        } else {
            tile.data.clone()
        };
        std::fs::write(out, &bytes)
            .with_context(|| format!("failed to write tile: {}", out.display()))?;
        info!(path = %out.display(), bytes = bytes.len(), "wrote tile");
    }
    if args.summary {
        if let Some(summary) = summarize_tile(&file, coord, args.layer.as_deref())? {
            for line in format_tile_summary_text(&summary) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn run_serve(args: ServeArgs, config: &MapConfig) -> Result<()> {
    let inputs = if args.inputs.is_empty() {
        match config.offline_layers_dir.clone() {
            Some(dir) => vec![dir],
            None => anyhow::bail!("no packages given and no offline_layers_dir configured"),
        }
    } else {
        args.inputs
    };
    let server = TileHttpServer::new(args.port.unwrap_or(config.tile_server_port))
        .with_request_timeout(config.request_timeout());
    for layer in collect_layers(&inputs)? {
        server.add_source(layer.id.clone(), layer.file.clone());
    }
    if server.source_names().is_empty() {
        anyhow::bail!("no readable .mbtiles packages found");
    }
    server.start()?;
    for name in server.source_names() {
        println!("{} {}", name, server.url_template(&name));
    }
    loop {
        std::thread::park();
    }
}

fn run_backends(args: BackendsArgs, config: &MapConfig) -> Result<()> {
    let registry = BackendRegistry::from_config(config);
    let layers = match args.layers_dir.as_ref().or(config.offline_layers_dir.as_ref()) {
        Some(dir) => load_offline_layers(dir)?,
        None => Vec::new(),
    };
    match args.output {
        ReportFormat::Json => println!("{}", backends_json(registry.entries(), &layers)?),
        ReportFormat::Text => {
            for line in format_backend_lines(registry.entries(), &layers) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn collect_layers(inputs: &[PathBuf]) -> Result<Vec<OfflineLayer>> {
    let mut layers = Vec::new();
    for input in inputs {
        if input.is_dir() {
            layers.extend(load_offline_layers(input)?);
        } else {
            layers.push(open_layer(input)?);
        }
    }
    Ok(layers)
}

fn open_layer(path: &Path) -> Result<OfflineLayer> {
    let id = layer_id(path).with_context(|| format!("no layer name in {}", path.display()))?;
    let file = MbtilesFile::open(path)?;
    Ok(OfflineLayer {
        id,
        file: Arc::new(file),
    })
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(level).unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
