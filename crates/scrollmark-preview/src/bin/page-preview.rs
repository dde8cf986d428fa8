use std::env;
use std::path::Path;
use std::process::ExitCode;

use scrollmark::{parse_html_with_limits, HtmlLimits};
use scrollmark_preview::{replay, PreviewConfig, Script};

#[derive(Clone, Debug, Default)]
struct Args {
    html_path: String,
    config_path: Option<String>,
    out_path: Option<String>,
    viewport: Option<(f64, f64)>,
    markup: bool,
    script: Script,
}

fn main() -> ExitCode {
    env_logger::init();
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", help_text());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let cli = parse_args(args)?;

    let mut config = match &cli.config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
            PreviewConfig::from_json(&text).map_err(|e| e.to_string())?
        }
        None => PreviewConfig::default(),
    };
    if let Some((width, height)) = cli.viewport {
        config.viewport_width = width;
        config.viewport_height = height;
    }
    if cli.markup {
        config.markup = true;
    }
    let config = config.normalized();

    let bytes = std::fs::read(&cli.html_path).map_err(|e| format!("{}: {}", cli.html_path, e))?;
    let doc = parse_html_with_limits(&bytes, HtmlLimits::default()).map_err(|e| e.to_string())?;
    log::info!("parsed {} ({} nodes)", cli.html_path, doc.node_count());

    let report = replay(doc, &config, &cli.script);
    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;

    match &cli.out_path {
        Some(out) if !out.is_empty() => {
            if let Some(parent) = Path::new(out).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
                }
            }
            std::fs::write(out, json).map_err(|e| e.to_string())?;
            println!(
                "wrote page preview to {} (toc_entries={}, steps={}, footnotes={})",
                out,
                report.toc.len(),
                report.steps.len(),
                report.footnotes.len(),
            );
        }
        Some(_) => return Err("--out must not be empty".to_string()),
        None => println!("{}", json),
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h") {
        return Err("help requested".to_string());
    }
    let html_path = args
        .get(1)
        .filter(|v| !v.starts_with("--"))
        .ok_or_else(|| "missing <page.html>".to_string())?;

    let mut cfg = Args {
        html_path: html_path.clone(),
        ..Args::default()
    };

    let mut i = 2usize;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let v = value_of(&args, i, "--config")?;
                cfg.config_path = Some(v.to_string());
                i += 2;
            }
            "--out" => {
                let v = value_of(&args, i, "--out")?;
                cfg.out_path = Some(v.to_string());
                i += 2;
            }
            "--scroll" => {
                let v = value_of(&args, i, "--scroll")?;
                for part in v.split(',').filter(|p| !p.trim().is_empty()) {
                    let y = part
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| format!("invalid --scroll value '{}'", part))?;
                    cfg.script.scroll.push(y);
                }
                i += 2;
            }
            "--viewport" => {
                let v = value_of(&args, i, "--viewport")?;
                cfg.viewport = Some(parse_viewport(v)?);
                i += 2;
            }
            "--markup" => {
                cfg.markup = true;
                i += 1;
            }
            "--hover" => {
                let v = value_of(&args, i, "--hover")?;
                cfg.script.hover.push(v.to_string());
                i += 2;
            }
            "--click" => {
                let v = value_of(&args, i, "--click")?;
                let n = v
                    .parse::<usize>()
                    .map_err(|_| format!("invalid --click value '{}'", v))?;
                cfg.script.click.push(n);
                i += 2;
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(cfg)
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", flag))
}

fn parse_viewport(value: &str) -> Result<(f64, f64), String> {
    let invalid = || format!("invalid --viewport value '{}'", value);
    let (w, h) = value.split_once('x').ok_or_else(invalid)?;
    let width = w.trim().parse::<f64>().map_err(|_| invalid())?;
    let height = h.trim().parse::<f64>().map_err(|_| invalid())?;
    Ok((width, height))
}

fn help_text() -> &'static str {
    r#"page-preview - replay scrollmark widgets over a rendered article

USAGE:
  cargo run -p scrollmark-preview --bin page-preview -- <page.html> [options]

OPTIONS:
  --config <file>        JSON preview configuration (missing keys use defaults)
  --out <file>           write the JSON report here instead of stdout
  --scroll <y,y,...>     scroll positions to replay, each followed by a frame
  --viewport <WxH>       window size in px (default: 1280x800)
  --markup               apply build-time markup rewrites before loading
  --hover <id>           hover the footnote reference with this id (repeatable)
  --click <n>            click the n-th image, then its backdrop (repeatable)

Set RUST_LOG=debug for widget diagnostics."#
}
