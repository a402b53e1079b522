// Protected handlers: JWT authentication and a resolved tenant context.
// Compliance routes additionally require a current tenant.
pub mod compliance;
pub mod tenants;
