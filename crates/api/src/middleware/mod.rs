//! Request authentication.
//!
//! - [`webhook_token::WebhookCaller`] -- Extractor requiring the shared
//!   webhook token in the `X-Webhook-Token` header or `token` query parameter.
//! - [`webhook_token::authorize`] -- The same check for handlers that also
//!   accept the token inside a JSON body.

pub mod webhook_token;
