pub mod constants;
pub mod fs;
pub mod logger;

#[cfg(test)]
pub mod test;
