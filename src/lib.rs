/*!
# Calculator Web Application

A small web calculator with user accounts, written in Rust.

## Overview

The calculator evaluates one binary expression at a time: two numbers and one
of four operations (add, subtract, multiply, divide). Anyone can use it;
signed-in users also get every successful calculation saved to a personal,
paginated history that can be exported as CSV or Excel.

## Architecture

### Core
- **calculator**: input validation, operation dispatch, failure classification,
  and the post-success history hook
- **history**: calculation records, history stores, pagination
- **saving**: gzip + bincode history files
- **downloader**: CSV and XLSX export

### Web layer (`web` feature)
- **app**: routing, request logging, calculator and history pages
- **login**: users, Argon2 password hashes, sessions, password reset and change
- **mailer**: SMTP delivery of reset codes and subscription confirmations
- **profile**: profile page and picture upload
- **subscribe**: email subscription capture
- **templates**: Handlebars pages

### Data Persistence Layer
Everything lives under one database directory:

```text
database/
  users.json
  subscribers.json
  <username>/history.bin.gz
  <username>/avatar.png
```

## Failure handling

Calculation failures never surface as HTTP errors. Bad numbers, an unknown
operation, division by zero and non-finite results are all turned into a
message on the form, with the user's input filled back in.
*/

pub mod calculator;
pub mod config;
pub mod downloader;
pub mod history;
pub mod mailer;
pub mod saving;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod login;
#[cfg(feature = "web")]
pub mod profile;
#[cfg(feature = "web")]
pub mod subscribe;
#[cfg(feature = "web")]
pub mod templates;

pub use calculator::{
    CalculationRequest, CalculationResult, CalculatorView, ErrorKind, OperationTag,
    UserReference, compute, evaluate, format_number,
};
pub use config::Config;
pub use history::{
    CalculationRecord, FileHistoryStore, HistoryStore, MemoryHistoryStore, Page, paginate,
};
