use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use engine::GameStatus;
use registry::GameRegistry;
use shared::domain::GameId;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/connect4.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored games, most recently updated first.
    List,
    New,
    /// Print the board, status and move log of a game.
    Show {
        game_id: i64,
    },
    Delete {
        game_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let registry = GameRegistry::new(Storage::new(&cli.database_url).await?);

    match cli.command {
        Command::List => {
            for game in registry.list().await? {
                println!(
                    "game_id={} moves={} created_at={} updated_at={}",
                    game.id,
                    game.moves_count,
                    game.created_at.to_rfc3339(),
                    game.updated_at.to_rfc3339()
                );
            }
        }
        Command::New => {
            let game = registry.create().await?;
            if let Some(game_id) = game.id() {
                println!("created game_id={game_id}");
            }
        }
        Command::Show { game_id } => {
            let game_id = GameId(game_id);
            let Some(game) = registry.load(game_id).await? else {
                bail!("game {game_id} not found");
            };

            println!("{game}");
            let engine = game.engine();
            match engine.status() {
                GameStatus::InProgress => {
                    println!("in progress, {} to move", engine.current_player().name())
                }
                GameStatus::Won => {
                    if let Some(winner) = engine.winner() {
                        println!("won by {}", winner.name());
                    }
                }
                GameStatus::Draw => println!("draw"),
            }
            for record in game.move_history().await? {
                println!(
                    "{:>3}. {:<6} column {}",
                    record.sequence_number,
                    record.player.name(),
                    record.column
                );
            }
        }
        Command::Delete { game_id } => {
            let game_id = GameId(game_id);
            if !registry.delete(game_id).await? {
                bail!("game {game_id} not found");
            }
            println!("deleted game_id={game_id}");
        }
    }

    Ok(())
}
