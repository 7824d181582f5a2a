pub mod relay;
pub mod revalidation;
