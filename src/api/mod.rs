pub mod coingecko;
pub mod okx;

pub use coingecko::CoinGeckoClient;
pub use okx::OkxClient;
