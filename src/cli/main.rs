use structopt::StructOpt;
use serde::Serialize;
use anyhow::{Context, bail};
use nalgebra::DMatrix;
use std::io;
use tracing_subscriber::EnvFilter;
use gaussmix::{GaussianMixture, MixtureSettings, MixtureParams, EmStatus, InitPolicy, matrix_from_rows};

/// Fit a Gaussian mixture to the rows of a CSV file and print the estimated parameters as JSON.
#[derive(StructOpt, Debug)]
#[structopt(name = "gaussmix")]
struct Opt {

    /// CSV file with one observation per row (numeric columns only).
    data : String,

    /// Number of mixture components.
    #[structopt(short = "k", long = "clusters")]
    n_cluster : Option<usize>,

    /// JSON file with the fit settings. Command line options override its fields.
    #[structopt(short, long)]
    config : Option<String>,

    /// Initialization policy (random or k_means).
    #[structopt(short, long)]
    init : Option<InitPolicy>,

    #[structopt(long)]
    max_iter : Option<usize>,

    #[structopt(long)]
    tol : Option<f64>,

    #[structopt(long)]
    seed : Option<u64>,

    /// Write this many observations generated from the fitted model as CSV to stdout.
    #[structopt(long)]
    samples : Option<usize>,

    /// Treat the first CSV row as a header.
    #[structopt(long)]
    header : bool

}

#[derive(Serialize)]
struct Report<'a> {

    n_obs : usize,

    iterations : usize,

    status : Option<EmStatus>,

    log_likelihood : Option<f64>,

    settings : &'a MixtureSettings,

    params : Option<&'a MixtureParams>

}

fn read_rows(path : &str, header : bool) -> anyhow::Result<DMatrix<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(header)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Could not open {}", path) )?;
    let mut rows = Vec::new();
    for (i, rec) in reader.records().enumerate() {
        let rec = rec.with_context(|| format!("Invalid CSV record at row {}", i) )?;
        let row = rec.iter()
            .map(|field| field.parse::<f64>() )
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Non-numeric field at row {}", i) )?;
        rows.push(row);
    }
    Ok(matrix_from_rows(&rows[..])?)
}

fn settings(opt : &Opt) -> anyhow::Result<MixtureSettings> {
    let mut settings = match (&opt.config, opt.n_cluster) {
        (Some(path), _) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path) )?;
            MixtureSettings::from_json(&content).context("Invalid settings file")?
        },
        (None, Some(k)) => MixtureSettings::new(k),
        (None, None) => bail!("Either --clusters or --config should be informed")
    };
    if let Some(k) = opt.n_cluster {
        settings.n_cluster = k;
    }
    if let Some(init) = opt.init {
        settings.init = init;
    }
    if let Some(max_iter) = opt.max_iter {
        settings.max_iter = max_iter;
    }
    if let Some(tol) = opt.tol {
        settings.tol = tol;
    }
    if let Some(seed) = opt.seed {
        settings.seed = seed;
    }
    Ok(settings)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opt = Opt::from_args();
    let y = read_rows(&opt.data, opt.header)?;
    let mut gmm = GaussianMixture::from_settings(settings(&opt)?)?;
    let iterations = gmm.fit(&y).context("Mixture fit failed")?;

    match opt.samples {
        Some(count) => {
            let draws = gmm.sample(count)?;
            let mut writer = csv::Writer::from_writer(io::stdout());
            for row in draws.row_iter() {
                writer.write_record(row.iter().map(|v| v.to_string() ))?;
            }
            writer.flush()?;
        },
        None => {
            let report = Report {
                n_obs : y.nrows(),
                iterations,
                status : gmm.status(),
                log_likelihood : gmm.trace().last().cloned(),
                settings : gmm.settings(),
                params : gmm.params()
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
