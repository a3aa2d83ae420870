use anyhow::Result;
use clap::{Parser, Subcommand};
use shop_schemas::OrderStatus;
use uuid::Uuid;

mod commands;

use commands::{console, ops};

#[derive(Parser)]
#[command(name = "shop")]
#[command(about = "Storefront operations and order console", long_about = None)]
struct Cli {
    /// Config layers in merge order (base -> overlays). Defaults to
    /// $SHOP_CONFIG, then config/base.yaml when present.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// REST API base URL including /api. Overrides $SHOP_API_URL and config.
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Admin account commands
    Admin {
        #[command(subcommand)]
        cmd: AdminCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Sign in to the order console (admin accounts only)
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Forget the stored session token
    Logout,

    /// Payment alarm controls
    Sound {
        #[command(subcommand)]
        cmd: SoundCmd,
    },

    /// Order console
    Orders {
        #[command(subcommand)]
        cmd: OrdersCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply embedded SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum AdminCmd {
    /// Create the default admin from the configured env vars. No-op if it exists.
    Seed,
}

#[derive(Subcommand)]
enum SoundCmd {
    /// Probe the alarm output and turn alerts on
    Enable,

    /// Turn alerts off
    Disable,

    /// Ring once (alerts must be enabled)
    Test,
}

#[derive(Subcommand)]
enum OrdersCmd {
    /// Print every order, newest first
    List,

    /// Poll for orders and ring when one gets paid
    Watch {
        /// Poll interval; defaults to watch.poll_interval_secs
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Change the status of a paid order
    SetStatus {
        order_id: Uuid,

        /// Order Placed | Packed | Shipped | Out for Delivery | Delivered
        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },
}

fn parse_status(s: &str) -> std::result::Result<OrderStatus, String> {
    OrderStatus::parse(s).ok_or_else(|| {
        let valid: Vec<&str> = OrderStatus::ALL.iter().map(OrderStatus::as_str).collect();
        format!("invalid status '{}'. expected one of: {}", s, valid.join(" | "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let loaded = ops::load_config(&cli.config_paths)?;
            let pool = ops::connect(&loaded).await?;
            match cmd {
                DbCmd::Status => {
                    let s = shop_db::status(&pool).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                }
                DbCmd::Migrate => {
                    shop_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::Admin { cmd } => match cmd {
            AdminCmd::Seed => {
                let loaded = ops::load_config(&cli.config_paths)?;
                ops::seed_admin(&loaded).await?;
            }
        },

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = shop_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Login { email, password } => {
            let ctx = console::Console::open(&cli.config_paths, cli.api.as_deref())?;
            ctx.login(&email, &password).await?;
        }

        Commands::Logout => {
            let ctx = console::Console::open(&cli.config_paths, cli.api.as_deref())?;
            ctx.logout().await?;
        }

        Commands::Sound { cmd } => {
            let ctx = console::Console::open(&cli.config_paths, cli.api.as_deref())?;
            let notifier = ctx.notifier();
            match cmd {
                SoundCmd::Enable => {
                    notifier.enable_sound()?;
                    println!("sound_enabled=true");
                }
                SoundCmd::Disable => {
                    notifier.disable_sound()?;
                    println!("sound_enabled=false");
                }
                SoundCmd::Test => {
                    notifier.test_sound()?;
                    println!("rang=true");
                }
            }
        }

        Commands::Orders { cmd } => {
            let ctx = console::Console::open(&cli.config_paths, cli.api.as_deref())?;
            match cmd {
                OrdersCmd::List => ctx.list().await?,
                OrdersCmd::Watch { interval_secs } => ctx.watch(interval_secs).await?,
                OrdersCmd::SetStatus { order_id, status } => {
                    ctx.set_status(order_id, status).await?
                }
            }
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
