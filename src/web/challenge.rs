// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP answers to refused requests
//!
//! | Variant | Status | Extra |
//! |---------|--------|-------|
//! | `Bearer` | 401 | `WWW-Authenticate` challenge |
//! | `Login` | 302 | `Location` of the login entry point |
//! | `Forbidden` | 403 | |
//! | `Rejected` | 400 | |
//! | `LoginFailure` | 401 or 502 | generic failure page |

use std::io::Cursor;

use log::{error, warn};
use rocket::http::{ContentType, Header, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};

use super::pages::failure_page_html;
use crate::security::{AuthError, ChainKind};

#[derive(Debug, Clone)]
pub enum Challenge {
    Bearer(AuthError),
    Login(String),
    Forbidden(AuthError),
    Rejected(AuthError),
    LoginFailure(AuthError),
}

impl Challenge {
    /// Map a chain failure to the answer of that chain.
    pub fn from_error(chain: ChainKind, error: AuthError, login_location: Option<&str>) -> Self {
        match (&error, chain) {
            (AuthError::RequestRejected(_), _) => Challenge::Rejected(error),
            (AuthError::Unauthorized(_), _) => Challenge::Forbidden(error),
            (_, ChainKind::Api) => Challenge::Bearer(error),
            (AuthError::UpstreamProvider(_), ChainKind::Web) => Challenge::LoginFailure(error),
            (_, ChainKind::Web) => match login_location {
                Some(location) => Challenge::Login(location.to_string()),
                None => Challenge::LoginFailure(error),
            },
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Challenge::Bearer(_) => Status::Unauthorized,
            Challenge::Login(_) => Status::Found,
            Challenge::Forbidden(_) => Status::Forbidden,
            Challenge::Rejected(_) => Status::BadRequest,
            Challenge::LoginFailure(error) if error.status() == Status::BadGateway => {
                Status::BadGateway
            }
            Challenge::LoginFailure(_) => Status::Unauthorized,
        }
    }
}

fn text<'o>(status: Status, body: &'static str) -> response::Result<'o> {
    Response::build()
        .status(status)
        .header(ContentType::Plain)
        .sized_body(body.len(), Cursor::new(body))
        .ok()
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Challenge {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match self {
            Challenge::Bearer(error) => Response::build()
                .status(status)
                .header(Header::new("WWW-Authenticate", error.bearer_challenge()))
                .ok(),
            Challenge::Login(location) => Response::build()
                .status(status)
                .header(Header::new("Location", location))
                .ok(),
            Challenge::Forbidden(error) => {
                warn!("Access denied: {}", error);
                text(status, "Forbidden")
            }
            Challenge::Rejected(error) => {
                warn!("{}", error);
                text(status, "Bad Request")
            }
            Challenge::LoginFailure(error) => {
                error!("Login failed: {}", error);
                let html = failure_page_html(status).map_err(|e| {
                    error!("Unable to render failure page: {}", e);
                    Status::InternalServerError
                })?;
                Response::build()
                    .status(status)
                    .header(ContentType::HTML)
                    .sized_body(html.len(), Cursor::new(html))
                    .ok()
            }
        }
    }
}
