//! The schema of vehicle unit downloads.
//!
//! A vehicle unit download consists of the responses to the transfer
//! requests of the download protocol. Each of them ends in a signature
//! over its content. The overview starts with the two certificates needed
//! to check these signatures and its own signature covers only what comes
//! after them.

use super::{Magic, Schema, SchemaNode, SizeAllocation};
use super::driver_card::{place_record, specific_condition_record};


/// Returns the schema for first generation vehicle unit files.
pub fn vehicle_unit() -> Schema {
    Schema::new("VehicleUnitData", vec![
        overview(),
        activities(),
        events_and_faults(),
        detailed_speed(),
        technical_data(),
    ])
}

fn overview() -> SchemaNode {
    SchemaNode::identified("Overview", Magic(0x7601), vec![
        SchemaNode::certificate("MemberStateCertificate"),
        SchemaNode::certificate("VuCertificate"),
        SchemaNode::simple_string("VehicleIdentificationNumber", 17),
        SchemaNode::vehicle_registration("VehicleRegistrationIdentification"),
        SchemaNode::time_real("CurrentDateTime"),
        SchemaNode::object("VuDownloadablePeriod", vec![
            SchemaNode::time_real("MinDownloadableTime"),
            SchemaNode::time_real("MaxDownloadableTime"),
        ]),
        SchemaNode::uint8("CardSlotsStatus"),
        SchemaNode::object("VuDownloadActivityData", vec![
            SchemaNode::time_real("DownloadingTime"),
            SchemaNode::full_card_number("FullCardNumber"),
            SchemaNode::name_string("CompanyOrWorkshopName"),
        ]),
        SchemaNode::collection(
            "VuCompanyLocksData", SizeAllocation::Byte, vec![
                SchemaNode::object("VuCompanyLocksRecord", vec![
                    SchemaNode::time_real("LockInTime"),
                    SchemaNode::time_real("LockOutTime"),
                    SchemaNode::name_string("CompanyName"),
                    SchemaNode::name_string("CompanyAddress"),
                    SchemaNode::full_card_number("CompanyCardNumber"),
                ]),
            ]
        ),
        SchemaNode::collection(
            "VuControlActivityData", SizeAllocation::Byte, vec![
                SchemaNode::object("VuControlActivityRecord", vec![
                    SchemaNode::uint8("ControlType"),
                    SchemaNode::time_real("ControlTime"),
                    SchemaNode::full_card_number("ControlCardNumber"),
                    SchemaNode::time_real("DownloadPeriodBeginTime"),
                    SchemaNode::time_real("DownloadPeriodEndTime"),
                ]),
            ]
        ),
        SchemaNode::signature("Signature", 128),
    ])
}

fn activities() -> SchemaNode {
    SchemaNode::identified("Activities", Magic(0x7602), vec![
        SchemaNode::time_real("DateOfDay"),
        SchemaNode::uint24("OdometerValueMidnight"),
        SchemaNode::collection("VuCardIWData", SizeAllocation::Word, vec![
            SchemaNode::object("VuCardIWRecord", vec![
                SchemaNode::object("CardHolderName", vec![
                    SchemaNode::name_string("HolderSurname"),
                    SchemaNode::name_string("HolderFirstNames"),
                ]),
                SchemaNode::full_card_number("FullCardNumber"),
                SchemaNode::time_real("CardExpiryDate"),
                SchemaNode::time_real("CardInsertionTime"),
                SchemaNode::uint24("VehicleOdometerValueAtInsertion"),
                SchemaNode::uint8("CardSlotNumber"),
                SchemaNode::time_real("CardWithdrawalTime"),
                SchemaNode::uint24("VehicleOdometerValueAtWithdrawal"),
                SchemaNode::object("PreviousVehicleInfo", vec![
                    SchemaNode::vehicle_registration(
                        "VehicleRegistrationIdentification"
                    ),
                    SchemaNode::time_real("CardWithdrawalTime"),
                ]),
                SchemaNode::flag("ManualInputFlag"),
            ]),
        ]),
        SchemaNode::collection(
            "VuActivityDailyData", SizeAllocation::Word, vec![
                SchemaNode::activity_change("ActivityChangeInfo"),
            ]
        ),
        SchemaNode::collection(
            "VuPlaceDailyWorkPeriodData", SizeAllocation::Byte, vec![
                SchemaNode::object("VuPlaceDailyWorkPeriodRecord", vec![
                    SchemaNode::full_card_number("FullCardNumber"),
                    place_record(),
                ]),
            ]
        ),
        SchemaNode::collection(
            "VuSpecificConditionData", SizeAllocation::Word, vec![
                specific_condition_record(),
            ]
        ),
        SchemaNode::signature("Signature", 128),
    ])
}

fn events_and_faults() -> SchemaNode {
    SchemaNode::identified("EventsAndFaults", Magic(0x7603), vec![
        SchemaNode::collection("VuFaultData", SizeAllocation::Byte, vec![
            SchemaNode::object("VuFaultRecord", vec![
                SchemaNode::uint8("FaultType"),
                SchemaNode::uint8("FaultRecordPurpose"),
                SchemaNode::time_real("FaultBeginTime"),
                SchemaNode::time_real("FaultEndTime"),
                SchemaNode::full_card_number("CardNumberDriverSlotBegin"),
                SchemaNode::full_card_number("CardNumberCodriverSlotBegin"),
                SchemaNode::full_card_number("CardNumberDriverSlotEnd"),
                SchemaNode::full_card_number("CardNumberCodriverSlotEnd"),
            ]),
        ]),
        SchemaNode::collection("VuEventData", SizeAllocation::Byte, vec![
            SchemaNode::object("VuEventRecord", vec![
                SchemaNode::uint8("EventType"),
                SchemaNode::uint8("EventRecordPurpose"),
                SchemaNode::time_real("EventBeginTime"),
                SchemaNode::time_real("EventEndTime"),
                SchemaNode::full_card_number("CardNumberDriverSlotBegin"),
                SchemaNode::full_card_number("CardNumberCodriverSlotBegin"),
                SchemaNode::full_card_number("CardNumberDriverSlotEnd"),
                SchemaNode::full_card_number("CardNumberCodriverSlotEnd"),
                SchemaNode::uint8("SimilarEventsNumber"),
            ]),
        ]),
        SchemaNode::object("VuOverSpeedingControlData", vec![
            SchemaNode::time_real("LastOverspeedControlTime"),
            SchemaNode::time_real("FirstOverspeedSince"),
            SchemaNode::uint8("NumberOfOverspeedSince"),
        ]),
        SchemaNode::collection(
            "VuOverSpeedingEventData", SizeAllocation::Byte, vec![
                SchemaNode::object("VuOverSpeedingEventRecord", vec![
                    SchemaNode::uint8("EventType"),
                    SchemaNode::uint8("EventRecordPurpose"),
                    SchemaNode::time_real("EventBeginTime"),
                    SchemaNode::time_real("EventEndTime"),
                    SchemaNode::uint8("MaxSpeedValue"),
                    SchemaNode::uint8("AverageSpeedValue"),
                    SchemaNode::full_card_number("CardNumberDriverSlotBegin"),
                    SchemaNode::uint8("SimilarEventsNumber"),
                ]),
            ]
        ),
        SchemaNode::collection(
            "VuTimeAdjustmentData", SizeAllocation::Byte, vec![
                SchemaNode::object("VuTimeAdjustmentRecord", vec![
                    SchemaNode::time_real("OldTimeValue"),
                    SchemaNode::time_real("NewTimeValue"),
                    SchemaNode::name_string("WorkshopName"),
                    SchemaNode::name_string("WorkshopAddress"),
                    SchemaNode::full_card_number("WorkshopCardNumber"),
                ]),
            ]
        ),
        SchemaNode::signature("Signature", 128),
    ])
}

fn detailed_speed() -> SchemaNode {
    SchemaNode::identified("DetailedSpeed", Magic(0x7604), vec![
        SchemaNode::collection(
            "VuDetailedSpeedData", SizeAllocation::Word, vec![
                SchemaNode::object("VuDetailedSpeedBlock", vec![
                    SchemaNode::time_real("SpeedBlockBeginDate"),
                    SchemaNode::hex_value("SpeedsPerSecond", 60),
                ]),
            ]
        ),
        SchemaNode::signature("Signature", 128),
    ])
}

fn technical_data() -> SchemaNode {
    SchemaNode::identified("TechnicalData", Magic(0x7605), vec![
        SchemaNode::object("VuIdentification", vec![
            SchemaNode::name_string("VuManufacturerName"),
            SchemaNode::name_string("VuManufacturerAddress"),
            SchemaNode::simple_string("VuPartNumber", 16),
            SchemaNode::extended_serial_number("VuSerialNumber"),
            SchemaNode::object("VuSoftwareIdentification", vec![
                SchemaNode::simple_string("VuSoftwareVersion", 4),
                SchemaNode::time_real("VuSoftInstallationDate"),
            ]),
            SchemaNode::time_real("VuManufacturingDate"),
            SchemaNode::simple_string("VuApprovalNumber", 8),
        ]),
        SchemaNode::object("SensorPaired", vec![
            SchemaNode::extended_serial_number("SensorSerialNumber"),
            SchemaNode::simple_string("SensorApprovalNumber", 8),
            SchemaNode::time_real("SensorPairingDateFirst"),
        ]),
        SchemaNode::collection(
            "VuCalibrationData", SizeAllocation::Byte, vec![
                SchemaNode::object("VuCalibrationRecord", vec![
                    SchemaNode::uint8("CalibrationPurpose"),
                    SchemaNode::name_string("WorkshopName"),
                    SchemaNode::name_string("WorkshopAddress"),
                    SchemaNode::full_card_number("WorkshopCardNumber"),
                    SchemaNode::time_real("WorkshopCardExpiryDate"),
                    SchemaNode::simple_string(
                        "VehicleIdentificationNumber", 17
                    ),
                    SchemaNode::vehicle_registration(
                        "VehicleRegistrationIdentification"
                    ),
                    SchemaNode::uint16("WVehicleCharacteristicConstant"),
                    SchemaNode::uint16("KConstantOfRecordingEquipment"),
                    SchemaNode::uint16("LTyreCircumference"),
                    SchemaNode::simple_string("TyreSize", 15),
                    SchemaNode::uint8("AuthorisedSpeed"),
                    SchemaNode::uint24("OldOdometerValue"),
                    SchemaNode::uint24("NewOdometerValue"),
                    SchemaNode::time_real("OldTimeValue"),
                    SchemaNode::time_real("NewTimeValue"),
                    SchemaNode::time_real("NextCalibrationDate"),
                ]),
            ]
        ),
        SchemaNode::signature("Signature", 128),
    ])
}


//============ Tests =========================================================
