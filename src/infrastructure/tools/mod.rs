mod stock_price;

pub use stock_price::{StockPriceArgs, StockPriceError, StockPriceTool};
