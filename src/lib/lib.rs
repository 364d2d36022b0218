pub mod lockup;
