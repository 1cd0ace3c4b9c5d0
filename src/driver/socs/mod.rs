pub mod nrf;
