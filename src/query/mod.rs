//! In-memory browsing transforms over a catalog snapshot. Everything here is
//! pure and synchronous: search and genre filtering narrow conjunctively,
//! then the result is sorted. Inputs are never mutated.

use crate::catalog::Song;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Popular,
    Downloads,
    Title,
    Artist,
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

fn matches_search(song: &Song, needle: &str) -> bool {
    if song.title.to_lowercase().contains(needle) || song.artist.to_lowercase().contains(needle) {
        return true;
    }
    match &song.album {
        Some(album) => album.to_lowercase().contains(needle),
        None => false,
    }
}

/// Narrows a snapshot by search term, then by genre. An empty or absent
/// search term matches everything; an absent genre filter is a no-op.
pub fn filter_songs(songs: &[Song], search: Option<&str>, genre: Option<&str>) -> Vec<Song> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    songs
        .iter()
        .filter(|song| match &needle {
            Some(needle) => matches_search(song, needle),
            None => true,
        })
        .filter(|song| match genre {
            Some(genre) => song.genre.as_deref() == Some(genre),
            None => true,
        })
        .cloned()
        .collect()
}

/// Sorts in place with the given key. Vec::sort_by is stable, so equal
/// elements keep their snapshot order.
pub fn sort_songs(songs: &mut [Song], sort: SortKey) {
    songs.sort_by(|a, b| match sort {
        SortKey::Newest => b.created.cmp(&a.created),
        SortKey::Oldest => a.created.cmp(&b.created),
        SortKey::Popular => b.views.cmp(&a.views),
        SortKey::Downloads => b.downloads.cmp(&a.downloads),
        SortKey::Title => a.title.cmp(&b.title),
        SortKey::Artist => a.artist.cmp(&b.artist),
    });
}

/// Filter then sort, on a copy of the snapshot.
pub fn filter_and_sort(
    songs: &[Song],
    search: Option<&str>,
    genre: Option<&str>,
    sort: SortKey,
) -> Vec<Song> {
    let mut filtered = filter_songs(songs, search, genre);
    sort_songs(&mut filtered, sort);
    filtered
}

pub const MAX_RECOMMENDATIONS: usize = 6;

/// All other songs sharing the focal song's exact genre, in snapshot order,
/// capped at six. A song without a genre recommends nothing.
pub fn recommendations(focal: &Song, songs: &[Song]) -> Vec<Song> {
    let genre = match &focal.genre {
        Some(genre) => genre,
        None => return Vec::new(),
    };
    songs
        .iter()
        .filter(|song| song.id != focal.id && song.genre.as_ref() == Some(genre))
        .take(MAX_RECOMMENDATIONS)
        .cloned()
        .collect()
}

/// Distinct non-empty genres in first-seen order, for filter dropdowns.
pub fn distinct_genres(songs: &[Song]) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for song in songs {
        if let Some(genre) = &song.genre {
            if !genre.is_empty() && !genres.iter().any(|g| g == genre) {
                genres.push(genre.clone());
            }
        }
    }
    genres
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, title: &str, artist: &str, album: Option<&str>, genre: Option<&str>) -> Song {
        Song {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.map(|a| a.to_string()),
            genre: genre.map(|g| g.to_string()),
            description: None,
            video_url: None,
            image_url: format!("http://localhost/blobs/images/{}.jpg", id),
            pdf_url: None,
            views: 0,
            downloads: 0,
            created: 0,
            updated: 0,
        }
    }

    fn sample_songs() -> Vec<Song> {
        vec![
            song("1", "Morning Light", "Dawn Choir", Some("Sunrise"), Some("Gospel")),
            song("2", "Night Drive", "Neon Dusk", None, Some("Synth")),
            song("3", "Light Years", "Dawn Choir", Some("Afterglow"), Some("Gospel")),
            song("4", "Quiet River", "Stone & Reed", Some("Valley"), None),
        ]
    }

    #[test]
    fn search_matches_title_artist_and_album() {
        let songs = sample_songs();

        let by_title = filter_songs(&songs, Some("morning"), None);
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id, "1");

        let by_artist = filter_songs(&songs, Some("dusk"), None);
        assert_eq!(by_artist.len(), 1);
        assert_eq!(by_artist[0].id, "2");

        let by_album = filter_songs(&songs, Some("valley"), None);
        assert_eq!(by_album.len(), 1);
        assert_eq!(by_album[0].id, "4");
    }

    #[test]
    fn empty_search_matches_everything() {
        let songs = sample_songs();
        assert_eq!(filter_songs(&songs, None, None).len(), songs.len());
        assert_eq!(filter_songs(&songs, Some(""), None).len(), songs.len());
        assert_eq!(filter_songs(&songs, Some("   "), None).len(), songs.len());
    }

    #[test]
    fn filters_are_conjunctive() {
        let songs = sample_songs();

        // "light" matches songs 1 and 3; genre Gospel matches 1 and 3;
        // combined must equal the intersection.
        let combined = filter_songs(&songs, Some("light"), Some("Gospel"));
        let by_search = filter_songs(&songs, Some("light"), None);
        let by_genre = filter_songs(&songs, None, Some("Gospel"));

        let intersection: Vec<&Song> = by_search
            .iter()
            .filter(|s| by_genre.iter().any(|g| g.id == s.id))
            .collect();
        assert_eq!(combined.len(), intersection.len());
        for (a, b) in combined.iter().zip(intersection) {
            assert_eq!(a.id, b.id);
        }

        // A search that matches a song outside the genre yields nothing.
        assert!(filter_songs(&songs, Some("night"), Some("Gospel")).is_empty());
    }

    #[test]
    fn sorts_by_title_ascending() {
        let mut songs = vec![
            song("1", "B", "x", None, None),
            song("2", "A", "x", None, None),
            song("3", "C", "x", None, None),
        ];
        sort_songs(&mut songs, SortKey::Title);
        let titles: Vec<&str> = songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn sorts_newest_first() {
        let mut songs = sample_songs();
        songs[0].created = 1; // t1
        songs[1].created = 3; // t3
        songs[2].created = 2; // t2
        songs[3].created = 0;
        sort_songs(&mut songs, SortKey::Newest);
        let created: Vec<i64> = songs.iter().map(|s| s.created).collect();
        assert_eq!(created, vec![3, 2, 1, 0]);
    }

    #[test]
    fn sorts_by_counters_descending() {
        let mut songs = sample_songs();
        songs[0].views = 5;
        songs[1].views = 9;
        songs[2].downloads = 7;

        sort_songs(&mut songs, SortKey::Popular);
        assert_eq!(songs[0].views, 9);
        assert_eq!(songs[1].views, 5);

        sort_songs(&mut songs, SortKey::Downloads);
        assert_eq!(songs[0].downloads, 7);
    }

    #[test]
    fn filter_and_sort_does_not_mutate_input() {
        let songs = sample_songs();
        let before: Vec<String> = songs.iter().map(|s| s.id.clone()).collect();
        let _ = filter_and_sort(&songs, Some("light"), None, SortKey::Title);
        let after: Vec<String> = songs.iter().map(|s| s.id.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn recommendations_share_genre_and_exclude_focal() {
        let songs = sample_songs();
        let recommended = recommendations(&songs[0], &songs);
        assert_eq!(recommended.len(), 1);
        assert_eq!(recommended[0].id, "3");
        assert!(recommended.iter().all(|s| s.id != songs[0].id));
    }

    #[test]
    fn recommendations_cap_at_six_in_snapshot_order() {
        let mut songs: Vec<Song> = (0..10)
            .map(|i| song(&i.to_string(), "t", "a", None, Some("Gospel")))
            .collect();
        songs.push(song("focal", "t", "a", None, Some("Gospel")));

        let focal = songs.last().unwrap().clone();
        let recommended = recommendations(&focal, &songs);
        assert_eq!(recommended.len(), MAX_RECOMMENDATIONS);
        let ids: Vec<&str> = recommended.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4", "5"]);
    }

    #[test]
    fn song_without_genre_recommends_nothing() {
        let songs = sample_songs();
        assert!(recommendations(&songs[3], &songs).is_empty());
    }

    #[test]
    fn distinct_genres_first_seen_order() {
        let songs = sample_songs();
        assert_eq!(distinct_genres(&songs), vec!["Gospel", "Synth"]);
    }
}
