pub mod tcg;
