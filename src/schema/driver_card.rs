//! The schema of driver card downloads.
//!
//! A driver card download is the sequence of the card’s elementary files,
//! each one followed by its signature unless it is one of the files that
//! aren’t signed.

use super::{Count, Magic, Schema, SchemaNode};


/// Returns the schema for first generation driver card files.
pub fn driver_card() -> Schema {
    Schema::new("DriverCardData", vec![
        SchemaNode::unsigned_file(
            "CardIccIdentification", Magic(0x0002), vec![
                SchemaNode::uint8("ClockStop"),
                SchemaNode::extended_serial_number(
                    "CardExtendedSerialNumber"
                ),
                SchemaNode::simple_string("CardApprovalNumber", 8),
                SchemaNode::uint8("CardPersonaliserId"),
                SchemaNode::hex_value("EmbedderIcAssemblerId", 5),
                SchemaNode::hex_value("IcIdentifier", 2),
            ]
        ),
        SchemaNode::unsigned_file(
            "CardChipIdentification", Magic(0x0005), vec![
                SchemaNode::hex_value("IcSerialNumber", 4),
                SchemaNode::hex_value("IcManufacturingReferences", 4),
            ]
        ),
        SchemaNode::elementary_file(
            "DriverCardApplicationIdentification", Magic(0x0501), vec![
                SchemaNode::uint8("TypeOfTachographCardId"),
                SchemaNode::hex_value("CardStructureVersion", 2),
                SchemaNode::uint8("NoOfEventsPerType").global(),
                SchemaNode::uint8("NoOfFaultsPerType").global(),
                SchemaNode::uint16("ActivityStructureLength"),
                SchemaNode::uint16("NoOfCardVehicleRecords").global(),
                SchemaNode::uint8("NoOfCardPlaceRecords").global(),
            ]
        ),
        SchemaNode::unsigned_file(
            "CardCertificate", Magic(0xC100),
            SchemaNode::certificate_fields()
        ),
        SchemaNode::unsigned_file(
            "CACertificate", Magic(0xC108),
            SchemaNode::certificate_fields()
        ),
        SchemaNode::elementary_file("Identification", Magic(0x0520), vec![
            SchemaNode::object("CardIdentification", vec![
                SchemaNode::country("CardIssuingMemberState"),
                SchemaNode::card_number("CardNumber"),
                SchemaNode::name_string("CardIssuingAuthorityName"),
                SchemaNode::time_real("CardIssueDate"),
                SchemaNode::time_real("CardValidityBegin"),
                SchemaNode::time_real("CardExpiryDate"),
            ]),
            SchemaNode::object("DriverCardHolderIdentification", vec![
                SchemaNode::name_string("CardHolderSurname"),
                SchemaNode::name_string("CardHolderFirstNames"),
                SchemaNode::datef("CardHolderBirthDate"),
                SchemaNode::simple_string("CardHolderPreferredLanguage", 2),
            ]),
        ]),
        SchemaNode::elementary_file("CardEventData", Magic(0x0502), vec![
            SchemaNode::repeat("CardEventRecords", Count::Fixed(6), vec![
                SchemaNode::repeat(
                    "CardEventRecordsOfType", "$NoOfEventsPerType", vec![
                        SchemaNode::object("CardEventRecord", vec![
                            SchemaNode::uint8("EventType"),
                            SchemaNode::time_real("EventBeginTime"),
                            SchemaNode::time_real("EventEndTime"),
                            SchemaNode::vehicle_registration(
                                "EventVehicleRegistration"
                            ),
                        ]),
                    ]
                ),
            ]),
        ]),
        SchemaNode::elementary_file("CardFaultData", Magic(0x0503), vec![
            SchemaNode::repeat("CardFaultRecords", Count::Fixed(2), vec![
                SchemaNode::repeat(
                    "CardFaultRecordsOfType", "$NoOfFaultsPerType", vec![
                        SchemaNode::object("CardFaultRecord", vec![
                            SchemaNode::uint8("FaultType"),
                            SchemaNode::time_real("FaultBeginTime"),
                            SchemaNode::time_real("FaultEndTime"),
                            SchemaNode::vehicle_registration(
                                "FaultVehicleRegistration"
                            ),
                        ]),
                    ]
                ),
            ]),
        ]),
        SchemaNode::elementary_file(
            "DriverActivityData", Magic(0x0504), vec![
                SchemaNode::cyclic_activity("CardDriverActivity", vec![
                    SchemaNode::daily_activity("CardActivityDailyRecord"),
                ]),
            ]
        ),
        SchemaNode::elementary_file("VehiclesUsed", Magic(0x0505), vec![
            SchemaNode::uint16("VehiclePointerNewestRecord"),
            SchemaNode::repeat(
                "CardVehicleRecords", "$NoOfCardVehicleRecords", vec![
                    SchemaNode::object("CardVehicleRecord", vec![
                        SchemaNode::uint24("VehicleOdometerBegin"),
                        SchemaNode::uint24("VehicleOdometerEnd"),
                        SchemaNode::time_real("VehicleFirstUse"),
                        SchemaNode::time_real("VehicleLastUse"),
                        SchemaNode::vehicle_registration(
                            "VehicleRegistration"
                        ),
                        SchemaNode::bcd_string("VuDataBlockCounter", 2),
                    ]),
                ]
            ),
        ]),
        SchemaNode::elementary_file("Places", Magic(0x0506), vec![
            SchemaNode::uint8("PlacePointerNewestRecord"),
            SchemaNode::repeat(
                "PlaceRecords", "$NoOfCardPlaceRecords", vec![
                    place_record(),
                ]
            ),
        ]),
        SchemaNode::elementary_file("CurrentUsage", Magic(0x0507), vec![
            SchemaNode::time_real("SessionOpenTime"),
            SchemaNode::vehicle_registration("SessionOpenVehicle"),
        ]),
        SchemaNode::elementary_file(
            "ControlActivityData", Magic(0x0508), vec![
                SchemaNode::uint8("ControlType"),
                SchemaNode::time_real("ControlTime"),
                SchemaNode::full_card_number("ControlCardNumber"),
                SchemaNode::vehicle_registration(
                    "ControlVehicleRegistration"
                ),
                SchemaNode::time_real("ControlDownloadPeriodBegin"),
                SchemaNode::time_real("ControlDownloadPeriodEnd"),
            ]
        ),
        SchemaNode::elementary_file(
            "SpecificConditions", Magic(0x0522), vec![
                SchemaNode::repeat(
                    "SpecificConditionRecords", Count::Fixed(56), vec![
                        specific_condition_record(),
                    ]
                ),
            ]
        ),
        SchemaNode::elementary_file("CardDownload", Magic(0x050E), vec![
            SchemaNode::time_real("LastCardDownload"),
        ]),
        SchemaNode::elementary_file(
            "DrivingLicenceInfo", Magic(0x0521), vec![
                SchemaNode::name_string("DrivingLicenceIssuingAuthority"),
                SchemaNode::country("DrivingLicenceIssuingNation"),
                SchemaNode::simple_string("DrivingLicenceNumber", 16),
            ]
        ),
    ])
}

/// Where a daily work period began or ended.
pub(super) fn place_record() -> SchemaNode {
    SchemaNode::object("PlaceRecord", vec![
        SchemaNode::time_real("EntryTime"),
        SchemaNode::uint8("EntryTypeDailyWorkPeriod"),
        SchemaNode::country("DailyWorkPeriodCountry"),
        SchemaNode::uint8("DailyWorkPeriodRegion"),
        SchemaNode::uint24("VehicleOdometerValue"),
    ])
}

pub(super) fn specific_condition_record() -> SchemaNode {
    SchemaNode::object("SpecificConditionRecord", vec![
        SchemaNode::time_real("EntryTime"),
        SchemaNode::uint8("SpecificConditionType"),
    ])
}


//============ Tests =========================================================
