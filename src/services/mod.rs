pub mod upstream;

#[cfg(test)]
pub(crate) mod scripted;
