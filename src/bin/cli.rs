//! msgsync CLI Client
//!
//! Command-line interface for interacting with a msgsync server.

use clap::{Parser, Subcommand};
use msgsync::network::Client;
use msgsync::protocol::Status;
use msgsync::sink::SinkRow;
use msgsync::{Record, RecordPatch};

/// msgsync CLI
#[derive(Parser, Debug)]
#[command(name = "msgsync-cli")]
#[command(about = "CLI for the msgsync message store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a message
    Create {
        /// Record id (a new UUID when omitted)
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        author: String,

        #[arg(long)]
        message: String,

        #[arg(long, default_value = "0")]
        likes: u32,

        #[arg(long)]
        image: Option<String>,
    },

    /// Update a message
    Update {
        id: String,

        #[arg(long)]
        author: String,

        #[arg(long)]
        message: String,

        #[arg(long, default_value = "0")]
        likes: u32,

        /// Overwrite the image with this value
        #[arg(long, conflicts_with = "clear_image")]
        image: Option<String>,

        /// Remove the image
        #[arg(long)]
        clear_image: bool,
    },

    /// Delete a message
    Del {
        id: String,
    },

    /// Show a message
    Get {
        id: String,
    },

    /// Run one reconciliation pass
    Sync,

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&mut client, args.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(client: &mut Client, command: Commands) -> msgsync::Result<()> {
    match command {
        Commands::Create {
            id,
            author,
            message,
            likes,
            image,
        } => {
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let status = client.create(Record::new(id.clone(), author, message, likes, image))?;
            print_status(status, &id);
        }
        Commands::Update {
            id,
            author,
            message,
            likes,
            image,
            clear_image,
        } => {
            let patch = if clear_image {
                RecordPatch::set_image(author, message, likes, None)
            } else if image.is_some() {
                RecordPatch::set_image(author, message, likes, image)
            } else {
                RecordPatch::keep_image(author, message, likes)
            };
            let status = client.update(&id, patch)?;
            print_status(status, &id);
        }
        Commands::Del { id } => {
            let status = client.delete(&id)?;
            print_status(status, &id);
        }
        Commands::Get { id } => match client.get(&id)? {
            Some(record) => println!("{}", SinkRow::from(&record)),
            None => println!("404 {}", id),
        },
        Commands::Sync => {
            let report = client.sync()?;
            println!(
                "applied {} mutations, {} remaining, {} rows in sink",
                report.applied, report.remaining, report.rows_written
            );
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }
    Ok(())
}

fn print_status(status: Status, id: &str) {
    println!("{} {}", status.http_code(), id);
}
