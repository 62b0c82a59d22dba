pub mod lzna;
