use anyhow::{Context, Error};
use beehive_client::{
    endpoints::{
        self, Credentials, DeleteHiveOptions, HivePatch, NewHive,
        NewHiveAnalysis, NewRootUser,
    },
    ApiClient, ApiError, Config, Payload, User,
};
use serde::Serialize;
use std::path::PathBuf;
use structopt::StructOpt;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::from_args();

    let config =
        Config::from_env(args.base_url.as_deref(), args.session_file.clone())?;
    log::debug!("Starting application with {:#?}", config);

    let client = ApiClient::from_config(&config)?;

    let result = run(&client, args.command).await;

    if let Err(e) = &result {
        let unauthorized = e
            .downcast_ref::<ApiError>()
            .map_or(false, ApiError::is_unauthorized);

        if unauthorized {
            log::warn!("The session was rejected, try `beehive login` again");
        }
    }

    result
}

async fn run(client: &ApiClient, command: Command) -> Result<(), Error> {
    match command {
        Command::Login { email, password } => {
            let session = endpoints::login(
                client,
                Credentials::new(&email, &password),
            )
            .await?;
            print_json(&session.user)
        },
        Command::Logout => {
            endpoints::logout(client)?;
            Ok(())
        },
        Command::Whoami => match client.stored_user() {
            Some(user) => print_json(&user),
            None => anyhow::bail!("Not logged in"),
        },
        Command::Register {
            name,
            email,
            password,
        } => {
            let new_user = NewRootUser {
                name: &name,
                email: &email,
                password: &password,
            };
            let user = endpoints::register_root(client, &new_user).await?;
            print_json(&user)
        },
        Command::Hives { user } => {
            let user_id = match user {
                Some(id) => id,
                None => current_user(client)?.id,
            };
            let hives = endpoints::get_all_hives(client, user_id).await?;
            print_json(&hives)
        },
        Command::AddHive {
            name,
            location,
            fields,
        } => {
            let user = current_user(client)?;
            let hive = NewHive {
                kind: fields.kind,
                size: fields.size,
                status: fields.status,
                ..NewHive::new(name, location)
            };
            let created = endpoints::create_hive(client, user.id, &hive).await?;
            print_payload(created)
        },
        Command::UpdateHive {
            hive_id,
            name,
            location,
            fields,
        } => {
            let user = current_user(client)?;
            let patch = HivePatch {
                name,
                location,
                kind: fields.kind,
                size: fields.size,
                status: fields.status,
            };
            anyhow::ensure!(!patch.is_empty(), "Nothing to update");

            let updated =
                endpoints::update_hive(client, user.id, hive_id, &patch)
                    .await?;
            print_payload(updated)
        },
        Command::DeleteHive { hive_id, permanent } => {
            let user = current_user(client)?;
            let options = DeleteHiveOptions {
                permanent: if permanent { Some(true) } else { None },
            };
            let response =
                endpoints::delete_hive(client, user.id, hive_id, options)
                    .await?;

            print_payload(response)
        },
        Command::Analyze {
            hive_id,
            image,
            varroa,
            confidence,
        } => {
            let user = current_user(client)?;
            anyhow::ensure!(
                (0.0..=1.0).contains(&confidence),
                "The confidence must be between 0 and 1"
            );

            let analysis = NewHiveAnalysis {
                hive_id,
                user_id: user.id,
                image_path: image.display().to_string(),
                varroa_detected: varroa,
                detection_confidence: confidence,
            };
            let recorded =
                endpoints::create_hive_analysis(client, &analysis).await?;
            print_payload(recorded)
        },
        Command::History => {
            let analyses = endpoints::list_hive_analyses(client).await?;

            for analysis in &analyses {
                log::info!(
                    "Hive #{} at {}: {} ({}%)",
                    analysis.hive_id,
                    analysis.created_at.as_deref().unwrap_or("?"),
                    if analysis.varroa_detected {
                        "varroa detected"
                    } else {
                        "healthy"
                    },
                    analysis.confidence_percent(),
                );
            }

            print_json(&analyses)
        },
    }
}

fn current_user(client: &ApiClient) -> Result<User, Error> {
    client
        .stored_user()
        .context("Not logged in, run `beehive login` first")
}

fn print_payload(payload: Payload) -> Result<(), Error> {
    match payload {
        Payload::Json(value) => print_json(&value),
        Payload::Text(text) if !text.trim().is_empty() => {
            println!("{}", text);
            Ok(())
        },
        Payload::Text(_) => Ok(()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Manage beehives and varroa analyses")]
struct Args {
    #[structopt(
        long = "base-url",
        help = "The backend's base URL (overrides $BEEHIVE_API_BASE_URL)"
    )]
    base_url: Option<String>,
    #[structopt(
        long = "session-file",
        parse(from_os_str),
        help = "Where to persist the login session"
    )]
    session_file: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(about = "Log in as a root user")]
    Login {
        #[structopt(short = "e", long = "email")]
        email: String,
        #[structopt(short = "p", long = "password")]
        password: String,
    },
    #[structopt(about = "Forget the current session")]
    Logout,
    #[structopt(about = "Show the logged in user")]
    Whoami,
    #[structopt(about = "Sign up a new root user")]
    Register {
        #[structopt(short = "n", long = "name")]
        name: String,
        #[structopt(short = "e", long = "email")]
        email: String,
        #[structopt(short = "p", long = "password")]
        password: String,
    },
    #[structopt(about = "List hives")]
    Hives {
        #[structopt(
            long = "user",
            help = "The root user whose hives to list (defaults to you)"
        )]
        user: Option<u64>,
    },
    #[structopt(about = "Register a new hive")]
    AddHive {
        #[structopt(long = "name")]
        name: String,
        #[structopt(long = "location")]
        location: String,
        #[structopt(flatten)]
        fields: HiveFields,
    },
    #[structopt(about = "Change some of a hive's details")]
    UpdateHive {
        hive_id: u64,
        #[structopt(long = "name")]
        name: Option<String>,
        #[structopt(long = "location")]
        location: Option<String>,
        #[structopt(flatten)]
        fields: HiveFields,
    },
    #[structopt(about = "Delete a hive")]
    DeleteHive {
        hive_id: u64,
        #[structopt(long = "permanent")]
        permanent: bool,
    },
    #[structopt(about = "Record a varroa analysis for a hive")]
    Analyze {
        hive_id: u64,
        #[structopt(long = "image", parse(from_os_str))]
        image: PathBuf,
        #[structopt(long = "varroa", help = "Mites were detected")]
        varroa: bool,
        #[structopt(long = "confidence", default_value = "0.9")]
        confidence: f64,
    },
    #[structopt(about = "Show every recorded analysis")]
    History,
}

#[derive(Debug, StructOpt)]
struct HiveFields {
    #[structopt(long = "type", help = "The bee species")]
    kind: Option<String>,
    #[structopt(long = "size")]
    size: Option<String>,
    #[structopt(long = "status")]
    status: Option<String>,
}
