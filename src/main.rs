use std::fs;
use std::io::Read;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use aopplan::app::App;
use aopplan::cli::{
    Cli, Command, PlanAdd, PlanCommand, PlanDashboard, PlanForm, PlanList, PlanRemove, PlanShow,
    PlanUpdate,
};
use aopplan::config::Settings;
use aopplan::db;
use aopplan::error::AppError;
use aopplan::evidence::LocalEvidenceStore;
use aopplan::model::{EvidenceUpload, PlanHeader, PlanSubmission, RowInput};
use aopplan::store::SqlitePlanStore;
use aopplan::util::{
    format_dashboard, format_dashboard_overview, format_plan_detail, format_plan_records,
};

const LOG_ENV: &str = "AOP_LOG";

type PlanApp = App<SqlitePlanStore, LocalEvidenceStore>;

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("aopplan=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), AppError> {
    let Cli {
        data_dir,
        max_upload_bytes,
        command,
    } = Cli::parse();
    let settings = Settings::resolve(data_dir, max_upload_bytes)?;

    let db_path = settings.db_path();
    let mut lock = db::open_lock(&settings.lock_path())?;
    match command {
        Command::Plan(command) if command.is_write() => {
            let _guard = lock.write()?;
            let store = SqlitePlanStore::open(&db_path).await?;
            handle_plan(&build_app(&settings, store), command).await
        }
        Command::Plan(command) => {
            if !db_path.exists() {
                let _guard = lock.write()?;
                SqlitePlanStore::open(&db_path).await?;
            }
            let _guard = lock.read()?;
            let store = SqlitePlanStore::open_existing(&db_path).await?;
            handle_plan(&build_app(&settings, store), command).await
        }
    }
}

fn build_app(settings: &Settings, store: SqlitePlanStore) -> PlanApp {
    let evidence = LocalEvidenceStore::new(settings.uploads_dir(), settings.max_upload_bytes);
    App::new(store, evidence)
}

async fn handle_plan(app: &PlanApp, command: PlanCommand) -> Result<(), AppError> {
    match command {
        PlanCommand::Add(args) => handle_plan_add(app, args).await,
        PlanCommand::Update(args) => handle_plan_update(app, args).await,
        PlanCommand::List(args) => handle_plan_list(app, args).await,
        PlanCommand::Show(args) => handle_plan_show(app, args).await,
        PlanCommand::Dashboard(args) => handle_plan_dashboard(app, args).await,
        PlanCommand::Remove(args) => handle_plan_remove(app, args).await,
    }
}

async fn handle_plan_add(app: &PlanApp, args: PlanAdd) -> Result<(), AppError> {
    let submission = read_submission(args.form)?;
    let plan = app.create_plan(submission).await?;
    println!("Created plan ID: {} (No. {})", plan.id, plan.id_no);
    Ok(())
}

async fn handle_plan_update(app: &PlanApp, args: PlanUpdate) -> Result<(), AppError> {
    let submission = read_submission(args.form)?;
    let plan = app.update_plan(&args.id, submission).await?;
    println!("Updated plan ID: {} (No. {})", plan.id, plan.id_no);
    Ok(())
}

async fn handle_plan_list(app: &PlanApp, args: PlanList) -> Result<(), AppError> {
    let details = app.list_plan_details().await?;
    if args.json {
        let plans: Vec<_> = details
            .iter()
            .map(|detail| {
                serde_json::json!({
                    "plan": detail.plan,
                    "summary": detail.summary,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }
    if details.is_empty() {
        println!("No plans found.");
        return Ok(());
    }
    println!("{}", format_plan_records(&details));
    Ok(())
}

async fn handle_plan_show(app: &PlanApp, args: PlanShow) -> Result<(), AppError> {
    let detail = app.get_plan_detail(&args.id).await?;
    if args.json {
        let value = serde_json::json!({
            "plan": detail.plan,
            "summary": detail.summary,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    println!("{}", format_plan_detail(&detail.plan, &detail.summary));
    Ok(())
}

async fn handle_plan_dashboard(app: &PlanApp, args: PlanDashboard) -> Result<(), AppError> {
    if let Some(id) = args.id {
        let detail = app.get_plan_detail(&id).await?;
        println!("{}", format_dashboard(&detail));
        return Ok(());
    }
    let details = app.list_plan_details().await?;
    if details.is_empty() {
        println!("No plans found.");
        return Ok(());
    }
    let cards: Vec<String> = details.iter().map(format_dashboard_overview).collect();
    println!("{}", cards.join("\n\n"));
    Ok(())
}

async fn handle_plan_remove(app: &PlanApp, args: PlanRemove) -> Result<(), AppError> {
    app.delete_plan(&args.id).await?;
    println!("Deleted plan ID: {}", args.id);
    Ok(())
}

fn read_submission(form: PlanForm) -> Result<PlanSubmission, AppError> {
    let PlanForm {
        development_area,
        outcome,
        strategy,
        rows,
        files,
    } = form;
    let payload = if rows == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&rows)?
    };
    let payload = if payload.trim().is_empty() {
        "[]"
    } else {
        payload.as_str()
    };
    let rows: Vec<RowInput> = serde_json::from_str(payload)?;

    Ok(PlanSubmission {
        header: PlanHeader {
            development_area,
            outcome,
            strategy,
        },
        rows,
        uploads: files
            .into_iter()
            .map(|file| EvidenceUpload {
                row_no: file.row_no,
                source: file.path,
            })
            .collect(),
    })
}
