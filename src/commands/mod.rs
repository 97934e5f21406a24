/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`    — Interactive streaming chat session
- `usage`   — Inspect or reset the usage ledger
- `history` — Manage locally cached conversations
- `models`  — Inspect the price table and select the active model

These handlers are intentionally small and compose the library
components: the completion client, the session driver, and the store.
*/

pub mod chat;
pub mod history;
pub mod models;
pub mod usage;
