//! At-rest protection for OAuth tokens

pub mod token_cipher;

pub use token_cipher::AesTokenCipher;
