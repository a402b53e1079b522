// Handlers are split by security tier:
// public (no auth) and protected (JWT plus tenant context, under /api/*)
pub mod protected;
pub mod public;
