//! Bag capacity, stacking, equipment and the shop.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::entities::{
    Character, EntityId, EquipmentSlot, EquippedItem, Inventory, InventoryItem, ItemId,
};
use crate::error::{Result, RulesError};

/// Receipt for a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub item_id: ItemId,
    pub quantity: u32,
    pub total_cost: u64,
}

impl Inventory {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: EntityId) -> Option<&InventoryItem> {
        self.rows.iter().find(|r| r.id == row)
    }

    fn get_mut(&mut self, row: EntityId) -> Option<&mut InventoryItem> {
        self.rows.iter_mut().find(|r| r.id == row)
    }

    /// Total quantity held of a catalog item, equipped rows included.
    pub fn count_of(&self, item_id: &ItemId) -> u32 {
        self.rows
            .iter()
            .filter(|r| &r.item_id == item_id)
            .map(|r| r.quantity)
            .sum()
    }

    /// Add items, merging into an existing row when the item stacks.
    ///
    /// Capacity counts rows, not items. Non-stackable items take one row
    /// each. Nothing changes when this returns an error.
    pub fn add(&mut self, catalog: &Catalog, item_id: &ItemId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(RulesError::Validation("quantity must be at least 1".into()));
        }
        let def = catalog.require_item(item_id)?;
        let capacity = catalog.settings().max_inventory_size;
        if self.rows.len() >= capacity {
            return Err(RulesError::InventoryFull { capacity });
        }

        if def.stackable {
            match self.rows.iter_mut().find(|r| &r.item_id == item_id) {
                Some(row) => {
                    row.quantity = row.quantity.checked_add(quantity).ok_or_else(|| {
                        RulesError::Validation(format!("too many {item_id} in one stack"))
                    })?;
                }
                None => self.rows.push(InventoryItem::new(item_id.clone(), quantity)),
            }
            return Ok(());
        }

        if self.rows.len() + quantity as usize > capacity {
            return Err(RulesError::InventoryFull { capacity });
        }
        for _ in 0..quantity {
            self.rows.push(InventoryItem::new(item_id.clone(), 1));
        }
        Ok(())
    }

    /// Remove items from unequipped rows, deleting rows that reach zero.
    pub fn remove(&mut self, item_id: &ItemId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(RulesError::Validation("quantity must be at least 1".into()));
        }
        let available: u32 = self
            .rows
            .iter()
            .filter(|r| &r.item_id == item_id && !r.equipped)
            .map(|r| r.quantity)
            .sum();
        if available < quantity {
            return Err(RulesError::InsufficientQuantity {
                item: item_id.clone(),
                available,
                requested: quantity,
            });
        }

        let mut remaining = quantity;
        for row in self
            .rows
            .iter_mut()
            .filter(|r| &r.item_id == item_id && !r.equipped)
        {
            let take = remaining.min(row.quantity);
            row.quantity -= take;
            remaining -= take;
            if remaining == 0 {
                break;
            }
        }
        self.rows.retain(|r| r.quantity > 0);
        Ok(())
    }
}

impl Character {
    pub fn add_item(&mut self, catalog: &Catalog, item_id: &ItemId, quantity: u32) -> Result<()> {
        self.inventory.add(catalog, item_id, quantity)
    }

    pub fn remove_item(&mut self, item_id: &ItemId, quantity: u32) -> Result<()> {
        self.inventory.remove(item_id, quantity)
    }

    /// Equip an inventory row, displacing whatever held the slot.
    pub fn equip(&mut self, catalog: &Catalog, row_id: EntityId) -> Result<EquipmentSlot> {
        let row = self
            .inventory
            .get(row_id)
            .ok_or(RulesError::ItemNotFound(row_id))?;
        let def = catalog.require_item(&row.item_id)?;
        let slot = def
            .slot()
            .ok_or_else(|| RulesError::NotEquippable(def.id.clone()))?;

        if let Some(previous) = self.equipment.slot(slot).map(|e| e.row) {
            if let Some(old) = self.inventory.get_mut(previous) {
                old.equipped = false;
            }
        }
        if let Some(new) = self.inventory.get_mut(row_id) {
            new.equipped = true;
        }
        *self.equipment.slot_mut(slot) = Some(EquippedItem {
            row: row_id,
            item_id: def.id.clone(),
            bonus: def.bonus(),
        });
        self.clamp_resources();

        tracing::debug!(character = %self.id, item = %def.id, ?slot, "equipped");
        Ok(slot)
    }

    /// Empty a slot. Returns the item that was removed, if any.
    pub fn unequip(&mut self, slot: EquipmentSlot) -> Option<ItemId> {
        let previous = self.equipment.slot_mut(slot).take()?;
        if let Some(row) = self.inventory.get_mut(previous.row) {
            row.equipped = false;
        }
        self.clamp_resources();
        Some(previous.item_id)
    }

    /// Buy from the shop. Gold is only spent if the items fit in the bag.
    pub fn buy(&mut self, catalog: &Catalog, item_id: &ItemId, quantity: u32) -> Result<Purchase> {
        if !catalog.in_shop(item_id) {
            return Err(RulesError::NotInShop(item_id.clone()));
        }
        let def = catalog.require_item(item_id)?;
        if quantity == 0 {
            return Err(RulesError::Validation("quantity must be at least 1".into()));
        }
        let total_cost = def
            .price
            .checked_mul(u64::from(quantity))
            .ok_or_else(|| RulesError::Validation("quantity too large".into()))?;
        if total_cost > self.gold {
            return Err(RulesError::InsufficientGold {
                required: total_cost,
                available: self.gold,
            });
        }

        self.inventory.add(catalog, item_id, quantity)?;
        self.gold -= total_cost;

        tracing::info!(character = %self.id, item = %item_id, quantity, total_cost, "purchase");
        Ok(Purchase {
            item_id: item_id.clone(),
            quantity,
            total_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GameSettings;
    use crate::entities::{ClassId, PersonalityId};
    use chrono::Utc;

    fn hero(catalog: &Catalog) -> Character {
        Character::create(
            catalog,
            "acct",
            "Bram",
            &ClassId::from("warrior"),
            &PersonalityId::from("cautious"),
            Utc::now(),
        )
        .unwrap()
    }

    fn small_bag(capacity: usize) -> Catalog {
        let catalog = Catalog::builtin().unwrap();
        let settings = GameSettings {
            max_inventory_size: capacity,
            starting_items: Vec::new(),
            ..catalog.settings().clone()
        };
        catalog.with_settings(settings)
    }

    fn row_of(character: &Character, item: &str) -> EntityId {
        character
            .inventory
            .rows
            .iter()
            .find(|r| r.item_id.as_str() == item && !r.equipped)
            .map(|r| r.id)
            .unwrap()
    }

    #[test]
    fn test_stack_overflow_rejected() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let potion = ItemId::from("health_potion");

        let err = hero.add_item(&catalog, &potion, u32::MAX).unwrap_err();
        assert!(matches!(err, RulesError::Validation(_)));
        assert_eq!(hero.inventory.count_of(&potion), 3);
    }

    #[test]
    fn test_stackable_items_merge() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let rows = hero.inventory.len();
        hero.add_item(&catalog, &ItemId::from("health_potion"), 2).unwrap();
        assert_eq!(hero.inventory.len(), rows);
        assert_eq!(hero.inventory.count_of(&ItemId::from("health_potion")), 5);
    }

    #[test]
    fn test_non_stackable_items_take_a_row_each() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let rows = hero.inventory.len();
        hero.add_item(&catalog, &ItemId::from("iron_sword"), 2).unwrap();
        assert_eq!(hero.inventory.len(), rows + 2);
        assert!(hero.inventory.rows.iter().all(|r| r.quantity >= 1));
    }

    #[test]
    fn test_full_bag_rejects_even_stackables() {
        let catalog = small_bag(1);
        let mut hero = hero(&catalog);
        hero.add_item(&catalog, &ItemId::from("health_potion"), 1).unwrap();
        assert_eq!(
            hero.add_item(&catalog, &ItemId::from("health_potion"), 1),
            Err(RulesError::InventoryFull { capacity: 1 })
        );
        assert_eq!(hero.inventory.count_of(&ItemId::from("health_potion")), 1);
    }

    #[test]
    fn test_non_stackable_batch_needs_room_for_all() {
        let catalog = small_bag(2);
        let mut hero = hero(&catalog);
        assert_eq!(
            hero.add_item(&catalog, &ItemId::from("iron_sword"), 3),
            Err(RulesError::InventoryFull { capacity: 2 })
        );
        assert!(hero.inventory.is_empty());
    }

    #[test]
    fn test_unknown_item_rejected() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        assert_eq!(
            hero.add_item(&catalog, &ItemId::from("excalibur"), 1),
            Err(RulesError::UnknownItem(ItemId::from("excalibur")))
        );
    }

    #[test]
    fn test_remove_decrements_and_deletes() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let potion = ItemId::from("health_potion");
        hero.remove_item(&potion, 2).unwrap();
        assert_eq!(hero.inventory.count_of(&potion), 1);
        hero.remove_item(&potion, 1).unwrap();
        assert!(hero.inventory.rows.iter().all(|r| r.item_id != potion));
    }

    #[test]
    fn test_remove_insufficient_quantity() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let potion = ItemId::from("health_potion");
        assert_eq!(
            hero.remove_item(&potion, 4),
            Err(RulesError::InsufficientQuantity {
                item: potion.clone(),
                available: 3,
                requested: 4
            })
        );
        assert_eq!(hero.inventory.count_of(&potion), 3);
        assert!(matches!(
            hero.remove_item(&ItemId::from("mana_potion"), 1),
            Err(RulesError::InsufficientQuantity { available: 0, .. })
        ));
    }

    #[test]
    fn test_equipped_rows_are_not_removed() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let sword = row_of(&hero, "rusty_sword");
        hero.equip(&catalog, sword).unwrap();
        assert!(matches!(
            hero.remove_item(&ItemId::from("rusty_sword"), 1),
            Err(RulesError::InsufficientQuantity { available: 0, .. })
        ));
    }

    #[test]
    fn test_equip_applies_bonus() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let base_attack = hero.attack();
        let base_defense = hero.defense();

        let sword = row_of(&hero, "rusty_sword");
        assert_eq!(hero.equip(&catalog, sword).unwrap(), EquipmentSlot::Weapon);
        let armor = row_of(&hero, "cloth_armor");
        assert_eq!(hero.equip(&catalog, armor).unwrap(), EquipmentSlot::Armor);

        assert_eq!(hero.attack(), base_attack + 5);
        assert_eq!(hero.defense(), base_defense + 3);
        assert!(hero.inventory.get(sword).unwrap().equipped);
    }

    #[test]
    fn test_second_weapon_replaces_first() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let base_attack = hero.attack();
        hero.add_item(&catalog, &ItemId::from("iron_sword"), 1).unwrap();

        let rusty = row_of(&hero, "rusty_sword");
        let iron = row_of(&hero, "iron_sword");
        hero.equip(&catalog, rusty).unwrap();
        hero.equip(&catalog, iron).unwrap();

        assert!(!hero.inventory.get(rusty).unwrap().equipped);
        assert!(hero.inventory.get(iron).unwrap().equipped);
        assert_eq!(hero.attack(), base_attack + 10);

        // Swapping back and forth never inflates attack.
        for _ in 0..5 {
            hero.equip(&catalog, rusty).unwrap();
            hero.equip(&catalog, iron).unwrap();
        }
        assert_eq!(hero.attack(), base_attack + 10);
    }

    #[test]
    fn test_equip_errors() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        let missing = EntityId::new();
        assert_eq!(
            hero.equip(&catalog, missing),
            Err(RulesError::ItemNotFound(missing))
        );
        let potion = row_of(&hero, "health_potion");
        assert_eq!(
            hero.equip(&catalog, potion),
            Err(RulesError::NotEquippable(ItemId::from("health_potion")))
        );
    }

    #[test]
    fn test_unequip_clamps_mp() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        hero.add_item(&catalog, &ItemId::from("magic_robe"), 1).unwrap();
        let robe = row_of(&hero, "magic_robe");
        let base_max_mp = hero.max_mp();

        hero.equip(&catalog, robe).unwrap();
        assert_eq!(hero.max_mp(), base_max_mp + 30);
        hero.full_restore();

        assert_eq!(
            hero.unequip(EquipmentSlot::Armor),
            Some(ItemId::from("magic_robe"))
        );
        assert_eq!(hero.max_mp(), base_max_mp);
        assert_eq!(hero.stats.mp, base_max_mp);
        assert!(!hero.inventory.get(robe).unwrap().equipped);
        assert_eq!(hero.unequip(EquipmentSlot::Armor), None);
    }

    #[test]
    fn test_buy_with_exact_gold() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        hero.gold = 100;
        let receipt = hero.buy(&catalog, &ItemId::from("health_potion"), 2).unwrap();
        assert_eq!(receipt.total_cost, 100);
        assert_eq!(hero.gold, 0);
        assert_eq!(hero.inventory.count_of(&ItemId::from("health_potion")), 5);
    }

    #[test]
    fn test_buy_one_gold_short() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        hero.gold = 99;
        assert_eq!(
            hero.buy(&catalog, &ItemId::from("health_potion"), 2),
            Err(RulesError::InsufficientGold {
                required: 100,
                available: 99
            })
        );
        assert_eq!(hero.gold, 99);
    }

    #[test]
    fn test_buy_not_in_shop() {
        let catalog = Catalog::builtin().unwrap();
        let mut hero = hero(&catalog);
        assert_eq!(
            hero.buy(&catalog, &ItemId::from("legendary_sword"), 1),
            Err(RulesError::NotInShop(ItemId::from("legendary_sword")))
        );
    }

    #[test]
    fn test_buy_into_full_bag_keeps_gold() {
        let catalog = small_bag(1);
        let mut hero = hero(&catalog);
        hero.add_item(&catalog, &ItemId::from("cloth_armor"), 1).unwrap();
        hero.gold = 1_000;
        assert_eq!(
            hero.buy(&catalog, &ItemId::from("iron_sword"), 1),
            Err(RulesError::InventoryFull { capacity: 1 })
        );
        assert_eq!(hero.gold, 1_000);
    }
}
