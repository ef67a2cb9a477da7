use crate::domain::ticket::{ConnectionType, Priority, ServiceType};

impl Priority {
    /// Fixed priority table. Faults outrank installations; within each,
    /// WIFI outranks DTH which outranks LANDLINE.
    pub fn for_request(service_type: ServiceType, connection_type: ConnectionType) -> Self {
        match (service_type, connection_type) {
            (ServiceType::Fault, ConnectionType::Wifi) => Priority::P1,
            (ServiceType::Fault, ConnectionType::Dth) => Priority::P2,
            (ServiceType::Fault, ConnectionType::Landline) => Priority::P3,
            (ServiceType::Installation, ConnectionType::Wifi) => Priority::P4,
            (ServiceType::Installation, ConnectionType::Dth) => Priority::P5,
            (ServiceType::Installation, ConnectionType::Landline) => Priority::P6,
        }
    }
}

/// Case-insensitive lookup of raw service and connection type names.
/// `None` for a missing input or a pair outside the table; callers treat that
/// as a validation failure, never as a default priority.
pub fn assign_priority(service_type: Option<&str>, connection_type: Option<&str>) -> Option<Priority> {
    let service_type = service_type?.parse::<ServiceType>().ok()?;
    let connection_type = connection_type?.parse::<ConnectionType>().ok()?;
    Some(Priority::for_request(service_type, connection_type))
}

#[cfg(test)]
mod tests {
    use super::assign_priority;
    use crate::domain::ticket::Priority;

    #[test]
    fn every_table_row_maps_to_its_priority() {
        let table = [
            ("FAULT", "WIFI", Priority::P1),
            ("FAULT", "DTH", Priority::P2),
            ("FAULT", "LANDLINE", Priority::P3),
            ("INSTALLATION", "WIFI", Priority::P4),
            ("INSTALLATION", "DTH", Priority::P5),
            ("INSTALLATION", "LANDLINE", Priority::P6),
        ];

        for (service, connection, expected) in table {
            assert_eq!(assign_priority(Some(service), Some(connection)), Some(expected));
            assert_eq!(
                assign_priority(
                    Some(&service.to_ascii_lowercase()),
                    Some(&connection.to_ascii_lowercase())
                ),
                Some(expected),
                "lookup must ignore case for {service}/{connection}"
            );
        }
    }

    #[test]
    fn mixed_case_fault_wifi_is_p1() {
        assert_eq!(assign_priority(Some("FAULT"), Some("wifi")), Some(Priority::P1));
    }

    #[test]
    fn unknown_pairs_have_no_priority() {
        assert_eq!(assign_priority(Some("fault"), Some("unknown")), None);
        assert_eq!(assign_priority(Some("upgrade"), Some("WIFI")), None);
        assert_eq!(assign_priority(Some(""), Some("")), None);
    }

    #[test]
    fn missing_inputs_have_no_priority() {
        assert_eq!(assign_priority(None, Some("WIFI")), None);
        assert_eq!(assign_priority(Some("FAULT"), None), None);
        assert_eq!(assign_priority(None, None), None);
    }
}
