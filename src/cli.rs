use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "aopplan",
    version,
    about = "Manage annual operational plans with SQLite"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "AOP_HOME",
        value_name = "PATH",
        help = "Directory holding the database and uploaded evidence"
    )]
    pub data_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "AOP_MAX_UPLOAD_BYTES",
        value_name = "BYTES",
        help = "Largest evidence file accepted"
    )]
    pub max_upload_bytes: Option<u64>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Plan(PlanCommand),
}

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    Add(PlanAdd),
    Update(PlanUpdate),
    List(PlanList),
    Show(PlanShow),
    Dashboard(PlanDashboard),
    Remove(PlanRemove),
}

impl PlanCommand {
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Add(_) | Self::Update(_) | Self::Remove(_))
    }
}

/// Header fields, rows and evidence files of a plan write.
#[derive(Args, Debug)]
pub struct PlanForm {
    #[arg(long)]
    pub development_area: String,
    #[arg(long)]
    pub outcome: String,
    #[arg(long)]
    pub strategy: String,
    #[arg(
        long,
        value_name = "FILE",
        default_value = "-",
        help = "JSON array of rows; '-' reads stdin"
    )]
    pub rows: String,
    #[arg(
        long = "file",
        value_name = "ROWNO=PATH",
        value_parser = parse_file_arg,
        help = "Evidence file for a row, repeatable"
    )]
    pub files: Vec<FileArg>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FileArg {
    pub row_no: i64,
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct PlanAdd {
    #[command(flatten)]
    pub form: PlanForm,
}

#[derive(Args, Debug)]
pub struct PlanUpdate {
    pub id: String,
    #[command(flatten)]
    pub form: PlanForm,
}

#[derive(Args, Debug)]
pub struct PlanList {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PlanShow {
    pub id: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PlanDashboard {
    pub id: Option<String>,
}

#[derive(Args, Debug)]
pub struct PlanRemove {
    pub id: String,
}

fn parse_file_arg(value: &str) -> Result<FileArg, String> {
    let (row_no, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ROWNO=PATH, got '{value}'"))?;
    let row_no = row_no
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid row number '{row_no}'"))?;
    if path.trim().is_empty() {
        return Err("evidence path cannot be empty".to_string());
    }
    Ok(FileArg {
        row_no,
        path: PathBuf::from(path),
    })
}
