//! Interactive catalog browser for a local database. Exercises the same
//! filtering, sorting and recommendation behavior the server exposes, with
//! a file-backed favorites set instead of a browser's local storage.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io;
use std::path::PathBuf;

mod catalog;
use catalog::{Song, SongStore, SqliteSongStore};

mod favorites;
use favorites::{FavoritesStore, FileFavoritesStore};

mod query;
use query::SortKey;

mod sqlite_persistence;

mod video_link;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s).canonicalize()?;
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite song catalog database file.
    #[clap(value_parser = parse_path)]
    pub catalog_db: PathBuf,

    /// Path of the favorites dump file. Defaults to favorites.json next to
    /// the database.
    #[clap(long)]
    pub favorites_file: Option<PathBuf>,
}

#[derive(Default)]
struct Browse {
    search: Option<String>,
    genre: Option<String>,
    sort: SortKey,
}

fn print_song_line(song: &Song, favorites: &dyn FavoritesStore) {
    let marker = if favorites.is_favorite(&song.id) {
        "*"
    } else {
        " "
    };
    println!(
        "{} {}  {} - {} [{}]  views:{} downloads:{}",
        marker,
        song.id,
        song.artist,
        song.title,
        song.genre.as_deref().unwrap_or("-"),
        song.views,
        song.downloads,
    );
}

fn print_song_details(song: &Song, all: &[Song]) {
    println!("{} - {}", song.artist, song.title);
    if let Some(album) = &song.album {
        println!("  album: {}", album);
    }
    if let Some(genre) = &song.genre {
        println!("  genre: {}", genre);
    }
    if let Some(description) = &song.description {
        println!("  {}", description);
    }
    println!("  cover: {}", song.image_url);
    if let Some(pdf_url) = &song.pdf_url {
        println!("  sheet: {}", pdf_url);
    }
    if let Some(embed) = song.video_url.as_deref().and_then(video_link::embed_url) {
        println!("  video: {}", embed);
    }
    println!("  views: {}  downloads: {}", song.views, song.downloads);

    let recommended = query::recommendations(song, all);
    if !recommended.is_empty() {
        println!("  more like this:");
        for other in recommended {
            println!("    {}  {} - {}", other.id, other.artist, other.title);
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  list                show songs with the current filters");
    println!("  search <term>       filter by title, artist or album");
    println!("  genre <name>        filter by exact genre");
    println!("  sort <key>          newest|oldest|popular|downloads|title|artist");
    println!("  clear               drop all filters");
    println!("  show <id>           song details and recommendations");
    println!("  fav <id>            toggle a favorite");
    println!("  favs                show favorited songs");
    println!("  genres              list known genres");
    println!("  quit");
}

fn run_command(
    line: &str,
    browse: &mut Browse,
    store: &dyn SongStore,
    favorites: &dyn FavoritesStore,
) -> Result<bool> {
    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "quit" | "exit" => return Ok(false),
        "help" => print_help(),
        "list" => {
            let songs = store.list_all()?;
            let songs = query::filter_and_sort(
                &songs,
                browse.search.as_deref(),
                browse.genre.as_deref(),
                browse.sort,
            );
            if songs.is_empty() {
                println!("No matches.");
            }
            for song in &songs {
                print_song_line(song, favorites);
            }
        }
        "search" => {
            browse.search = if arg.is_empty() {
                None
            } else {
                Some(arg.to_string())
            };
        }
        "genre" => {
            browse.genre = if arg.is_empty() {
                None
            } else {
                Some(arg.to_string())
            };
        }
        "sort" => match SortKey::from_str(arg, true) {
            Ok(sort) => browse.sort = sort,
            Err(_) => println!("Unknown sort key \"{}\".", arg),
        },
        "clear" => *browse = Browse::default(),
        "show" => match store.get(arg)? {
            Some(song) => print_song_details(&song, &store.list_all()?),
            None => println!("No song with id \"{}\".", arg),
        },
        "fav" => match store.get(arg)? {
            Some(song) => {
                let favorited = favorites.toggle(arg)?.iter().any(|f| f == arg);
                let verb = if favorited { "Added" } else { "Removed" };
                println!("{} \"{}\"", verb, song.title);
            }
            None => println!("No song with id \"{}\".", arg),
        },
        "favs" => {
            for id in favorites.list() {
                match store.get(&id)? {
                    Some(song) => print_song_line(&song, favorites),
                    None => println!("  {} (no longer in the catalog)", id),
                }
            }
        }
        "genres" => {
            for genre in query::distinct_genres(&store.list_all()?) {
                println!("  {}", genre);
            }
        }
        "" => {}
        other => println!("Unknown command \"{}\", try \"help\".", other),
    }

    Ok(true)
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let favorites_path = match cli_args.favorites_file {
        Some(path) => path,
        None => cli_args
            .catalog_db
            .parent()
            .context("Could not resolve the database directory")?
            .join("favorites.json"),
    };

    println!("Opening catalog at {}...", cli_args.catalog_db.display());
    let store = SqliteSongStore::new(&cli_args.catalog_db)?;
    let favorites = FileFavoritesStore::initialize(favorites_path);
    println!("Done! Type \"help\" for commands.");

    let mut browse = Browse::default();
    loop {
        let mut user_input = String::new();
        io::stdin()
            .read_line(&mut user_input)
            .context("Failed to read line")?;

        if !run_command(user_input.trim(), &mut browse, &store, &favorites)? {
            return Ok(());
        }
    }
}
