pub mod devices;
pub mod ingest;
pub mod playlists;
pub mod studios;
