//! User service CLI.
//!
//! ```text
//!   user-service ──▶ UserService ──▶ ResilientClient ──▶ RemoteCall ──▶ department-service
//!                                     │ rate_limit
//!                                     │ circuit_breaker
//!                                     │ timeouts
//!                                     └ fallback
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use user_service::config::{load_config, ResiliencePolicy, ServiceConfig};
use user_service::departments::{
    DepartmentDto, DepartmentFallback, DepartmentStore, LocalDepartments, NewDepartment,
};
use user_service::discovery::ServiceRegistry;
use user_service::observability::{logging, metrics};
use user_service::remote::HttpRemoteCall;
use user_service::resilience::{CallRequest, ResilientClient, Response};
use user_service::users::{InMemoryUserRepository, NewUser, UserService};

#[derive(Parser)]
#[command(name = "user-service")]
#[command(about = "User service with a rate-limited, circuit-broken department client", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one department over HTTP
    Department { id: i64 },
    /// Burst N department lookups and report each outcome
    Probe {
        id: i64,
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// Run scenarios against an in-process department store
    Demo,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("user-service v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::Department { id } => {
            let client = http_client(&config);
            let response = client
                .call(CallRequest::new(config.department.service.as_str(), id.to_string()))
                .await;
            print_response(&response)?;
        }
        Commands::Probe { id, count } => {
            let client = Arc::new(http_client(&config));
            let service = UserService::new(
                Arc::new(InMemoryUserRepository::new()),
                client,
                config.department.service.as_str(),
            );
            for (n, response) in service.probe_department(id, count).await.iter().enumerate() {
                let status = response.reason().map_or("live", |reason| reason.as_str());
                println!(
                    "#{:<3} {:<20} {}",
                    n + 1,
                    status,
                    response.payload().department_name
                );
            }
        }
        Commands::Demo => run_demo(&config).await?,
    }

    Ok(())
}

fn http_client(
    config: &ServiceConfig,
) -> ResilientClient<HttpRemoteCall<DepartmentDto>, DepartmentFallback> {
    let registry = Arc::new(ServiceRegistry::new(&config.instances, &config.discovery));
    let remote = HttpRemoteCall::new(registry, config.department.path.as_str());
    ResilientClient::new(remote, DepartmentFallback, config.resilience.clone())
}

async fn run_demo(config: &ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(DepartmentStore::new());
    let engineering = store.save_department(NewDepartment {
        department_name: "Engineering".to_string(),
        department_address: "Pune".to_string(),
        department_code: "ENG-1".to_string(),
    });

    let client = Arc::new(ResilientClient::new(
        LocalDepartments::new(Arc::clone(&store)),
        DepartmentFallback,
        config.resilience.clone(),
    ));
    let resource = config.department.service.as_str();
    let service = UserService::new(
        Arc::new(InMemoryUserRepository::new()),
        Arc::clone(&client),
        resource,
    );

    println!("== live lookup");
    let user = service
        .save_user(NewUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            department_id: engineering.id,
        })
        .await;
    println!("{}", serde_json::to_string_pretty(&service.get_user(user.id).await?)?);

    println!("== burst beyond the limiter capacity");
    let capacity = config.resilience.policy_for(resource).capacity as usize;
    let responses = service.probe_department(engineering.id, capacity + 3).await;
    let rejected = responses.iter().filter(|r| r.used_fallback()).count();
    println!("{} calls, {} rejected", responses.len(), rejected);

    println!("== failing lookups open the circuit");
    client.rate_limiter().register(resource, &unlimited(config, resource));
    let threshold = config.resilience.policy_for(resource).failure_threshold;
    for _ in 0..=threshold {
        let response = client.call(CallRequest::new(resource, "404")).await;
        print_response(&response)?;
    }
    println!("breaker is {}", client.circuit_breaker().state(resource));

    Ok(())
}

/// Policy with enough permits that the demo's breaker scenario is not
/// throttled.
fn unlimited(config: &ServiceConfig, resource: &str) -> ResiliencePolicy {
    let mut policy = config.resilience.policy_for(resource);
    policy.capacity = u32::MAX;
    policy
}

fn print_response<P>(response: &Response<P>) -> Result<(), serde_json::Error>
where
    P: serde::Serialize,
{
    let body = json!({
        "department": response.payload(),
        "fallback": response.reason(),
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
