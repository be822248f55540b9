use std::path::PathBuf;

use spatrel_data::synthetic::{self, SyntheticParams};

use crate::util::Output;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct GenerateArg {
    /// Number of rows to generate
    #[arg(long, default_value_t = 1000)]
    rows: usize,
    /// Dimension of the word vectors (at least 3)
    #[arg(long, default_value_t = 16)]
    embedding_dim: usize,
    /// Standard deviation of the object placement noise
    #[arg(long, default_value_t = 0.03)]
    noise: f32,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Output file path of the dataset
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output file path of the embedding table
    #[arg(long)]
    embeddings_output: PathBuf,
}

pub(crate) fn run(arg: &GenerateArg) -> anyhow::Result<()> {
    let GenerateArg {
        rows,
        embedding_dim,
        noise,
        seed,
        output,
        embeddings_output,
    } = arg;
    let params = SyntheticParams {
        rows: *rows,
        embedding_dim: *embedding_dim,
        noise: *noise,
        seed: *seed,
    };
    let (dataset, embeddings) = synthetic::generate(&params);
    eprintln!(
        "Generated {} rows over {} words (dim {})",
        dataset.len(),
        embeddings.len(),
        embeddings.dim()
    );

    Output::save_json(&embeddings, Some(embeddings_output.clone()))?;
    eprintln!("Embeddings saved to {}", embeddings_output.display());
    Output::save_json(&dataset, output.clone())?;
    Ok(())
}
