use buku_tamu::app::admin_panel::{self, AdminFormat};
use buku_tamu::app::guest_session::{self, SessionOutcome};
use buku_tamu::core::ConfigProvider;
use buku_tamu::domain::model::trim_name;
use buku_tamu::utils::error::ErrorSeverity;
use buku_tamu::utils::{logger, validation::Validate};
use buku_tamu::{
    cancel_pair, CliConfig, Command, GuestBookConfig, GuestBookError, GuestVerifier,
    GuestWorkflow, JsonSubmissionStore, LocalStorage, SheetListProvider,
};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(
                "❌ {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            e.severity().exit_code()
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: &CliConfig) -> Result<i32, GuestBookError> {
    let config = cli.resolve()?;
    config.validate()?;

    let store = Arc::new(
        JsonSubmissionStore::new(LocalStorage::new(config.data_dir()))
            .with_key(config.store_key())
            .with_quota(config.quota_bytes())
            .with_corrupt_policy(config.store.on_corrupt),
    );

    match &cli.command {
        Command::Guest => {
            let mut workflow = GuestWorkflow::new(store).with_max_guests(config.max_guests());
            guest_session::render(workflow.view(), &mut std::io::stdout())?;

            let provider = provider(&config);
            let (cancel, mut signal) = cancel_pair();
            let loading_done = Arc::new(AtomicBool::new(false));
            {
                // Ctrl-C 在載入中取消載入，之後直接結束程式
                let loading_done = loading_done.clone();
                tokio::spawn(async move {
                    while tokio::signal::ctrl_c().await.is_ok() {
                        if loading_done.load(Ordering::SeqCst) {
                            std::process::exit(130);
                        }
                        cancel.cancel();
                    }
                });
            }
            let loaded = workflow
                .begin_loading(
                    &provider,
                    config.name_field(),
                    config.load_timeout(),
                    &mut signal,
                )
                .await;
            loading_done.store(true, Ordering::SeqCst);
            if let Err(e) = loaded {
                tracing::debug!("Guest list unavailable: {}", e);
            }

            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut output = std::io::stdout();
            let outcome = guest_session::run_guest_session(&mut workflow, &mut input, &mut output)
                .await?;

            Ok(match outcome {
                SessionOutcome::Submitted(_) | SessionOutcome::Abandoned => 0,
                SessionOutcome::Unavailable => ErrorSeverity::Medium.exit_code(),
            })
        }
        Command::Check { name } => {
            let provider = provider(&config);
            let (_cancel, mut signal) = cancel_pair();
            let verifier = GuestVerifier::load_within(
                &provider,
                config.name_field(),
                config.load_timeout(),
                &mut signal,
            )
            .await?;

            if verifier.is_invited(name) {
                println!("✅ {} terdaftar dalam undangan.", trim_name(name));
                Ok(0)
            } else {
                println!("❌ {}", buku_tamu::core::workflow::NOT_REGISTERED_MESSAGE);
                Ok(1)
            }
        }
        Command::Admin { csv, token } => {
            admin_panel::authorize(config.admin_token(), token.as_deref())?;
            let format = if *csv {
                AdminFormat::Csv
            } else {
                AdminFormat::Table
            };
            admin_panel::run_admin_panel(store.as_ref(), format, &mut std::io::stdout()).await?;
            Ok(0)
        }
    }
}

fn provider(config: &GuestBookConfig) -> SheetListProvider {
    SheetListProvider::new(config.list_endpoint())
        .with_headers(config.source.headers.clone())
        .with_request_timeout(config.load_timeout())
}
