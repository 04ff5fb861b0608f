pub mod generate_headers;
pub mod generate_tiles;
pub mod generate_tree;
