// handlers/mod.rs - handlers grouped by security tier
//
// Public (no identity) → Protected (caller identity resolved, results scoped to it)
// → Elevated (caller identity must carry the admin role)
pub mod elevated;
pub mod protected;
pub mod public;
