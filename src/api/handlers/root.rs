/*
 * Responsibility
 * - GET / (public, no auth)
 */
pub async fn root() -> &'static str {
    "Hello, world!"
}
