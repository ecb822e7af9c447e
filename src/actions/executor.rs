use core::fmt;

use crate::{
    config::{ActionRoute, DispatchConfig, IncidentsConfig},
    platform::{DialerOps, LocationOps, UserAlert},
};

use super::{
    incident::{IncidentReport, IncidentReporterOps},
    table::{dial_uri, ActionTable},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActionReceipt {
    pub action: &'static str,
    pub uri: String,
    pub incident_reported: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ActionError {
    UnknownAction(String),
    DialUnavailable {
        action: String,
        number: String,
    },
    DialFailed {
        action: String,
        number: String,
        reason: String,
    },
}

impl ActionError {
    /// Dial failures always carry the number so the user can dial it by hand.
    pub fn to_alert(&self) -> UserAlert {
        match self {
            Self::UnknownAction(action) => UserAlert::UnknownAction {
                action: action.clone(),
            },
            Self::DialUnavailable { action, number } | Self::DialFailed { action, number, .. } => {
                UserAlert::DialManually {
                    action: action.clone(),
                    number: number.clone(),
                }
            }
        }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAction(action) => write!(f, "unknown action `{action}`"),
            Self::DialUnavailable { number, .. } => write!(f, "cannot open tel:{number}"),
            Self::DialFailed { number, reason, .. } => write!(f, "dialing {number}: {reason}"),
        }
    }
}

impl std::error::Error for ActionError {}

/// Resolves an action name and places the call.
pub struct ActionExecutor {
    table: ActionTable,
    incidents: IncidentsConfig,
    dialer: Box<dyn DialerOps>,
    reporter: Option<Box<dyn IncidentReporterOps>>,
    location: Option<Box<dyn LocationOps>>,
    user_id: Option<String>,
}

impl ActionExecutor {
    pub fn new(config: &'static DispatchConfig, dialer: Box<dyn DialerOps>) -> Self {
        Self {
            table: ActionTable::from_config(config),
            incidents: config.incidents,
            dialer,
            reporter: None,
            location: None,
            user_id: None,
        }
    }

    pub fn with_incident_reporter(mut self, reporter: Box<dyn IncidentReporterOps>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_location(mut self, location: Box<dyn LocationOps>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn set_user_id(&mut self, user_id: Option<String>) {
        self.user_id = user_id;
    }

    pub fn run(&mut self, action_name: &str) -> Result<ActionReceipt, ActionError> {
        let Some(route) = self.table.resolve(action_name) else {
            log::warn!("actions: unknown action={action_name:?}");
            return Err(ActionError::UnknownAction(action_name.to_string()));
        };

        let dialed = self.dial(route);
        // Reporting is independent of the dial outcome.
        let incident_reported = self.report_incident(route);
        let uri = dialed?;
        Ok(ActionReceipt {
            action: route.name,
            uri,
            incident_reported,
        })
    }

    fn dial(&mut self, route: &'static ActionRoute) -> Result<String, ActionError> {
        let uri = dial_uri(route.number);
        if !self.dialer.can_open(&uri) {
            log::error!("actions: dial_unavailable uri={uri}");
            return Err(ActionError::DialUnavailable {
                action: route.name.to_string(),
                number: route.number.to_string(),
            });
        }
        if let Err(err) = self.dialer.open(&uri) {
            log::error!("actions: dial_failed uri={uri} err={err:#}");
            return Err(ActionError::DialFailed {
                action: route.name.to_string(),
                number: route.number.to_string(),
                reason: format!("{err:#}"),
            });
        }
        log::info!("actions: dialed action={:?} uri={uri}", route.name);
        Ok(uri)
    }

    fn report_incident(&mut self, route: &ActionRoute) -> bool {
        if !self.incidents.enabled {
            return false;
        }
        let Some(reporter) = self.reporter.as_mut() else {
            return false;
        };

        let location = match self.location.as_mut() {
            Some(provider) => match provider.current_location() {
                Ok(location) => Some(location),
                Err(err) => {
                    log::warn!("incident: location_unavailable err={err:#}");
                    None
                }
            },
            None => None,
        };
        let report = IncidentReport::new(
            route,
            self.incidents.status,
            location.as_ref(),
            self.user_id.as_deref(),
        );
        match reporter.report(report) {
            Ok(()) => true,
            Err(err) => {
                log::warn!(
                    "incident: report_failed type={} err={err:#}",
                    route.incident_type
                );
                false
            }
        }
    }
}
