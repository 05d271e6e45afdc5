//! Inter-company stock transfers.

use stockbook_core::{CostLine, ItemState, LotOrigin, SaleCostRecord};

use crate::CostingError;

/// Move `quantity` units of an item from one company's ledger to another's.
///
/// The source side is a FIFO draw, exactly like a sale but without a cost
/// record: the oldest lots lose units first. Each drawn segment arrives on
/// the destination side as [`LotOrigin::Transferred`] supply at its original
/// unit cost, offered to the destination's pending sale records before the
/// remainder joins the destination queue. Purchase linkage does not cross the
/// company boundary, so a later amendment of the source purchase never
/// reaches the destination ledger.
///
/// Unlike a sale, a transfer may not overdraw: an oversold or insufficient
/// source fails with [`CostingError::InsufficientStock`] and neither ledger
/// is touched.
///
/// Returns the moved segments for reporting.
pub fn transfer(
    source: &mut ItemState,
    dest: &mut ItemState,
    dest_pending: &mut [SaleCostRecord],
    quantity: u64,
) -> Result<Vec<CostLine>, CostingError> {
    let available = source.total_stock.max(0) as u64;
    if quantity > available {
        return Err(CostingError::InsufficientStock {
            requested: quantity,
            available,
        });
    }

    let consumption = source.queue.consume(quantity);
    source.total_stock -= quantity as i64;

    for line in &consumption.lines {
        crate::absorb_new_supply(
            dest,
            LotOrigin::Transferred,
            line.unit_cost,
            line.units,
            dest_pending.iter_mut(),
        );
    }

    Ok(consumption.lines)
}
