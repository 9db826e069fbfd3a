//! Linha de comando do etiquetador POS: treino, avaliação e varredura de features.
//!
//! ```text
//! postag train train.col dev.col 137 --iterations 3
//! postag evaluate dev.col prediction.txt
//! postag sweep train.col dev.col --script sweep.sh
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pos_core::{
    checkpoint::JsonCheckpoint,
    corpus::{TaggedCorpus, TsvSink},
    evaluation::{align, Confusion, ScoreReport},
    sweep::{flag_combinations, run_sweep, write_script, ScriptOptions},
    FeatureFlags, PosError, TrainConfig, Trainer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "postag", about = "Etiquetador morfossintático com perceptron")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Treina sobre o corpus de treino e grava as predições para o corpus de teste
    Train(TrainArgs),
    /// Compara um arquivo gold com um arquivo de predições
    Evaluate(EvaluateArgs),
    /// Percorre todas as 255 combinações de features
    Sweep(SweepArgs),
}

/// Parâmetros de treino compartilhados por `train` e `sweep`.
#[derive(Args, Debug)]
struct PassArgs {
    /// Número total de passadas, contando a inicial
    #[arg(long, default_value = "1")]
    iterations: usize,

    /// Quanto subtrair de cada peso penalizado
    #[arg(long, default_value = "100")]
    step: f64,
}

impl PassArgs {
    fn config(&self) -> Result<TrainConfig> {
        let mut config = TrainConfig::default();
        config.set_iterations(self.iterations)?;
        config.set_step(self.step)?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Corpus de treino (`palavra tag` por linha)
    train: PathBuf,

    /// Corpus de teste com tags gold
    test: PathBuf,

    /// Tipos de feature habilitados, ex: "137"
    flags: FeatureFlags,

    #[command(flatten)]
    passes: PassArgs,

    /// Onde gravar o snapshot dos pesos
    #[arg(long, default_value = "weights.json")]
    checkpoint: PathBuf,

    /// Onde gravar as predições
    #[arg(long, default_value = "prediction.txt")]
    predictions: PathBuf,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Arquivo gold
    gold: PathBuf,

    /// Arquivo de predições (`palavra \t tag`)
    predicted: PathBuf,

    /// Imprime o relatório como JSON
    #[arg(long)]
    json: bool,

    /// Imprime também o desempenho de cada tag
    #[arg(long)]
    by_tag: bool,
}

#[derive(Args, Debug)]
struct SweepArgs {
    train: PathBuf,

    test: PathBuf,

    #[command(flatten)]
    passes: PassArgs,

    /// Em vez de treinar aqui, gera um script bash com uma chamada por combinação
    #[arg(long)]
    script: Option<PathBuf>,

    /// Executável chamado pelo script
    #[arg(long, default_value = "postag")]
    program: String,

    /// Arquivo de predições usado pelo script
    #[arg(long, default_value = "prediction.txt")]
    predictions: String,

    /// Arquivo onde o script acumula os relatórios
    #[arg(long, default_value = "output.txt")]
    output: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Train(args) => train(args),
        Command::Evaluate(args) => evaluate(args),
        Command::Sweep(args) => sweep(args),
    }
}

fn read_corpus(path: &Path) -> Result<TaggedCorpus> {
    TaggedCorpus::read(path).with_context(|| format!("lendo {}", path.display()))
}

fn train(args: TrainArgs) -> Result<()> {
    let train = read_corpus(&args.train)?;
    let test = read_corpus(&args.test)?;
    let config = args.passes.config()?;

    let mut trainer = Trainer::new(
        &train,
        test,
        args.flags,
        config,
        JsonCheckpoint::new(&args.checkpoint),
        TsvSink::new(&args.predictions),
    );
    let outcome = trainer.train()?;

    info!(
        tags = outcome.weights.num_tags(),
        features = outcome.weights.num_features(),
        erros = outcome.final_errors(),
        predicoes = %args.predictions.display(),
        "treino concluído"
    );
    Ok(())
}

fn evaluate(args: EvaluateArgs) -> Result<()> {
    let alignment = match align(&args.gold, &args.predicted) {
        Ok(alignment) => alignment,
        Err(PosError::LengthMismatch { .. }) => {
            // Sem alinhamento não há métricas; não é falha do processo
            println!("documents of different length");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let confusion = Confusion::build(&alignment);
    let report = ScoreReport::from_confusion(&confusion);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer(&mut out, &report)?;
        writeln!(out)?;
    } else {
        write!(out, "{report}")?;
    }
    if args.by_tag {
        write!(out, "{confusion}")?;
        let accuracy = alignment
            .accuracy()
            .map_or_else(|| "undefined".to_string(), |a| format!("{a:.4}"));
        writeln!(out, "Discordâncias: {} de {}", alignment.disagreements(), alignment.len())?;
        writeln!(out, "Acurácia: {accuracy}")?;
    }
    Ok(())
}

fn sweep(args: SweepArgs) -> Result<()> {
    if let Some(path) = &args.script {
        let opts = ScriptOptions {
            program: args.program.clone(),
            train: args.train.display().to_string(),
            test: args.test.display().to_string(),
            predictions: args.predictions.clone(),
            output: args.output.clone(),
            iterations: args.passes.iterations,
        };
        let file = File::create(path).with_context(|| format!("criando {}", path.display()))?;
        write_script(BufWriter::new(file), &opts)?;
        info!(script = %path.display(), "script de varredura gerado");
        return Ok(());
    }

    let train = read_corpus(&args.train)?;
    let test = read_corpus(&args.test)?;
    let config = args.passes.config()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut write_error = None;
    let results = run_sweep(&train, &test, &config, &flag_combinations(), |result| {
        if write_error.is_some() {
            return;
        }
        let line = serde_json::to_string(result).map_err(anyhow::Error::from);
        if let Err(e) = line.and_then(|l| writeln!(out, "{l}").map_err(anyhow::Error::from)) {
            write_error = Some(e);
        }
    })?;
    if let Some(e) = write_error {
        return Err(e);
    }

    if let Some(best) = results
        .iter()
        .filter(|r| r.report.micro_f1.is_some())
        .max_by(|a, b| a.report.micro_f1.partial_cmp(&b.report.micro_f1).unwrap_or(std::cmp::Ordering::Equal))
    {
        info!(flags = %best.flags, micro_f1 = ?best.report.micro_f1, "melhor combinação");
    }
    Ok(())
}
